//! Model Registry — доступ к реестру моделей (MLflow-совместимый REST).
//!
//! Реестр ненадёжен: каждый вызов может упасть или зависнуть. Решение о fallback
//! принимает вызывающая сторона, здесь — только типизированные ошибки.

mod artifact;
mod client;
mod error;
mod traits;
mod types;

pub use artifact::{locate_artifact, ArtifactLocation, MODEL_FILE};
pub use client::MlflowRegistry;
pub use error::RegistryError;
pub use traits::ModelRegistry;
pub use types::{ModelVersion, PRODUCTION_STAGE};
