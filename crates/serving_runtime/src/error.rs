//! Ошибки сервинга. SchemaMismatch — ошибка клиента, остальное — сервера.

use churn_model::{ModelError, SchemaViolation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServingError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(SchemaViolation),

    /// Тело запроса не разобрано как запись признаков.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("model {provenance} produced invalid output: {detail}")]
    InvalidModelOutput { provenance: String, detail: String },

    #[error("model error: {0}")]
    Model(ModelError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<ModelError> for ServingError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::SchemaMismatch(v) => ServingError::SchemaMismatch(v),
            ModelError::MalformedRecord(detail) => ServingError::MalformedRequest(detail),
            other => ServingError::Model(other),
        }
    }
}
