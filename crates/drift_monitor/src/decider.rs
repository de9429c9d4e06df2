//! RetrainDecider — чистое сравнение drift_share с порогом (строгое >).

use serde::Serialize;

use crate::error::DriftError;
use crate::evaluator::DriftReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrainDecision {
    pub should_retrain: bool,
    pub reason: String,
}

/// Граница не включается: drift_share == threshold — без переобучения.
pub fn decide(report: &DriftReport, threshold: f64) -> RetrainDecision {
    let share = report.drift_share();
    let should_retrain = share > threshold;
    let op = if should_retrain { ">" } else { "<=" };
    RetrainDecision {
        should_retrain,
        reason: format!("drift_share={} {} threshold={}", share, op, threshold),
    }
}

/// Порог из конфигурации, проверенный один раз.
#[derive(Debug, Clone, Copy)]
pub struct RetrainDecider {
    threshold: f64,
}

impl RetrainDecider {
    pub fn new(threshold: f64) -> Result<Self, DriftError> {
        if threshold.is_nan() || !(0.0..=1.0).contains(&threshold) {
            return Err(DriftError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn decide(&self, report: &DriftReport) -> RetrainDecision {
        decide(report, self.threshold)
    }
}
