//! Ошибки мониторинга. Видны оператору, на сервинг не влияют.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("malformed drift report: {0}")]
    MalformedDriftReport(String),

    #[error("dataset schemas differ: only in reference [{only_reference}], only in current [{only_current}]")]
    DatasetSchemaMismatch {
        only_reference: String,
        only_current: String,
    },

    #[error("dataset load failed for {uri}: {reason}")]
    DatasetLoad { uri: String, reason: String },

    #[error("training pipeline launch failed: {0}")]
    TrainingPipelineLaunchFailure(String),

    #[error("invalid drift threshold {0}, expected a value in [0, 1]")]
    InvalidThreshold(f64),

    #[error("drift computation failed: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
