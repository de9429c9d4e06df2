//! Churn Model — единый интерфейс модели оттока для сервинга.
//!
//! Модель не знает про реестр и HTTP: получает FeatureRecord, отдаёт вектор вероятностей.

mod error;
mod fallback;
mod features;
mod linear;
mod reference;
mod traits;

pub use error::{ModelError, SchemaViolation};
pub use fallback::{StaticFallbackModel, STATIC_FALLBACK_PROVENANCE};
pub use features::{FeatureKind, FeatureRecord, FeatureSchema, FeatureValue, FieldSpec};
pub use linear::{LinearArtifact, LinearChurnModel, ARTIFACT_FORMAT};
pub use reference::ModelReference;
pub use traits::{ChurnModel, ProbabilityVector};
