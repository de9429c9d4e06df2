//! PredictionService — FeatureRecord → (вероятность оттока, provenance).
//!
//! Счётчик +1 на каждый вызов, задержка пишется и на пути ошибки.
//! Модель не меняется здесь: замена только через ModelResolver::refresh.

use std::sync::Arc;

use churn_model::FeatureRecord;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cell::{ModelCell, ModelSnapshot};
use crate::error::ServingError;
use crate::metrics::ServingMetrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub probability: f64,
    pub provenance: String,
}

pub struct PredictionService {
    cell: Arc<ModelCell>,
    metrics: Arc<ServingMetrics>,
}

impl PredictionService {
    pub fn new(cell: Arc<ModelCell>, metrics: Arc<ServingMetrics>) -> Self {
        Self { cell, metrics }
    }

    pub fn metrics(&self) -> &Arc<ServingMetrics> {
        &self.metrics
    }

    /// Снимок текущей модели (provenance + generation).
    pub fn current(&self) -> Arc<ModelSnapshot> {
        self.cell.load()
    }

    pub fn predict(&self, features: &FeatureRecord) -> Result<Prediction, ServingError> {
        // Таймер пишет наблюдение при drop, в том числе при раннем выходе по ошибке.
        let _timer = self.metrics.latency().start_timer();
        self.metrics.requests().inc();
        self.predict_counted(features)
    }

    /// predict для сырого JSON-тела: ошибка разбора учитывается как обычный вызов.
    pub fn predict_json(&self, body: Value) -> Result<Prediction, ServingError> {
        let _timer = self.metrics.latency().start_timer();
        self.metrics.requests().inc();
        let features = FeatureRecord::from_json_value(body).map_err(|e| {
            debug!(error = %e, "request body rejected");
            ServingError::from(e)
        })?;
        self.predict_counted(&features)
    }

    /// Запрос, отвергнутый до разбора (не JSON, нет content-type). Тоже +1 к счётчику.
    pub fn reject(&self, detail: impl Into<String>) -> ServingError {
        let _timer = self.metrics.latency().start_timer();
        self.metrics.requests().inc();
        let detail = detail.into();
        debug!(detail = %detail, "request rejected before decoding");
        ServingError::MalformedRequest(detail)
    }

    fn predict_counted(&self, features: &FeatureRecord) -> Result<Prediction, ServingError> {
        let snapshot = self.cell.load();
        let reference = snapshot.reference();

        let vector = reference.handle().predict_probability(features).map_err(|e| {
            debug!(provenance = %reference.provenance(), error = %e, "prediction rejected");
            ServingError::from(e)
        })?;

        let probability = vector.positive_class().ok_or_else(|| ServingError::InvalidModelOutput {
            provenance: reference.provenance().to_string(),
            detail: "empty probability vector".to_string(),
        })?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ServingError::InvalidModelOutput {
                provenance: reference.provenance().to_string(),
                detail: format!("probability {} outside [0, 1]", probability),
            });
        }

        Ok(Prediction {
            probability,
            provenance: reference.provenance().to_string(),
        })
    }
}
