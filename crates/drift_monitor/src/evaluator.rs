//! DriftEvaluator — готовит входы для вычисления дрейфа и валидирует результат.
//!
//! drift_share вне [0, 1], NaN или отсутствующий — MalformedDriftReport, без clamp.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::computation::DriftComputation;
use crate::dataset::Dataset;
use crate::error::DriftError;

#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    drift_share: f64,
    raw: Value,
}

impl DriftReport {
    pub fn new(drift_share: f64) -> Result<Self, DriftError> {
        validate_share(drift_share)?;
        Ok(Self {
            drift_share,
            raw: serde_json::json!({ "metrics": [{ "result": { "drift_share": drift_share } }] }),
        })
    }

    /// Достаёт metrics[0].result.drift_share из сырого отчёта.
    pub fn from_raw(raw: Value) -> Result<Self, DriftError> {
        let share = raw
            .get("metrics")
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("result"))
            .and_then(|r| r.get("drift_share"))
            .ok_or_else(|| DriftError::MalformedDriftReport("drift_share is missing".to_string()))?;
        let drift_share = share
            .as_f64()
            .ok_or_else(|| DriftError::MalformedDriftReport(format!("drift_share is not a number: {}", share)))?;
        validate_share(drift_share)?;
        Ok(Self { drift_share, raw })
    }

    pub fn drift_share(&self) -> f64 {
        self.drift_share
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn validate_share(share: f64) -> Result<(), DriftError> {
    if share.is_nan() || !(0.0..=1.0).contains(&share) {
        return Err(DriftError::MalformedDriftReport(format!(
            "drift_share {} outside [0, 1]",
            share
        )));
    }
    Ok(())
}

pub struct DriftEvaluator {
    computation: Arc<dyn DriftComputation>,
}

impl DriftEvaluator {
    pub fn new(computation: Arc<dyn DriftComputation>) -> Self {
        Self { computation }
    }

    pub fn evaluate(&self, reference: &Dataset, current: &Dataset) -> Result<DriftReport, DriftError> {
        reference.check_same_schema(current)?;
        let raw = self.computation.compute(reference, current)?;
        let report = DriftReport::from_raw(raw).map_err(|e| {
            error!(error = %e, "drift computation returned a malformed report");
            e
        })?;
        info!(
            drift_share = report.drift_share(),
            reference_rows = reference.row_count(),
            current_rows = current.row_count(),
            "drift evaluated"
        );
        Ok(report)
    }

    /// Отчёт, посчитанный внешним инструментом и сохранённый в JSON.
    pub async fn evaluate_report_file(path: &Path) -> Result<DriftReport, DriftError> {
        let text = tokio::fs::read_to_string(path).await?;
        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| DriftError::MalformedDriftReport(format!("parse {}: {}", path.display(), e)))?;
        DriftReport::from_raw(raw)
    }
}

/// Сохраняет сырой отчёт для оператора.
pub async fn write_report(report: &DriftReport, path: &Path) -> Result<(), DriftError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(report.raw())
        .map_err(|e| DriftError::Computation(e.to_string()))?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
