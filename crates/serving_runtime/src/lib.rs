//! Serving Runtime — выбор модели и сервинг предсказаний.
//!
//! Pipeline: ModelResolver → ModelCell (атомарная замена) → PredictionService → метрики.

mod cell;
mod error;
mod metrics;
mod prediction;
mod resolver;

pub use cell::{ModelCell, ModelSnapshot};
pub use error::ServingError;
pub use metrics::ServingMetrics;
pub use prediction::{Prediction, PredictionService};
pub use resolver::{ModelResolver, RefreshOutcome, Resolution, ResolutionTier};
