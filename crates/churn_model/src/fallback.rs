//! StaticFallbackModel — модель без внешних данных, когда реестр недоступен.
//!
//! Стратегия prior: частоты классов на минимальной синтетической выборке [0, 1].
//! Вывод всегда двухколоночный.

use crate::error::ModelError;
use crate::features::{FeatureRecord, FeatureSchema};
use crate::traits::{ChurnModel, ProbabilityVector};

/// Provenance статической модели. Не пересекается с URI реестра (models:/...).
pub const STATIC_FALLBACK_PROVENANCE: &str = "fallback-static";

const SYNTHETIC_LABELS: [u8; 2] = [0, 1];

#[derive(Debug, Clone)]
pub struct StaticFallbackModel {
    priors: [f64; 2],
    schema: FeatureSchema,
}

impl StaticFallbackModel {
    pub fn new() -> Self {
        Self::with_schema(FeatureSchema::telco_churn())
    }

    pub fn with_schema(schema: FeatureSchema) -> Self {
        Self {
            priors: fit_prior(&SYNTHETIC_LABELS),
            schema,
        }
    }

    pub fn priors(&self) -> [f64; 2] {
        self.priors
    }
}

impl Default for StaticFallbackModel {
    fn default() -> Self {
        Self::new()
    }
}

fn fit_prior(labels: &[u8]) -> [f64; 2] {
    let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
    let total = labels.len() as f64;
    let p = positives / total;
    [1.0 - p, p]
}

impl ChurnModel for StaticFallbackModel {
    fn predict_probability(&self, features: &FeatureRecord) -> Result<ProbabilityVector, ModelError> {
        self.schema.validate(features)?;
        Ok(ProbabilityVector::new(self.priors.to_vec()))
    }
}
