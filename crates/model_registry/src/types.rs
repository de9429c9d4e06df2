//! Метаданные версий модели в формате MLflow Model Registry.

use serde::{Deserialize, Serialize};

pub const PRODUCTION_STAGE: &str = "Production";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub current_stage: Option<String>,
    /// URI артефакта: путь, file://, http(s)://, runs:/, mlflow-artifacts:/.
    pub source: String,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl ModelVersion {
    /// Provenance вида models:/<name>/<version>.
    pub fn provenance(&self) -> String {
        format!("models:/{}/{}", self.name, self.version)
    }
}
