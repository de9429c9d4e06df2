//! Конфигурация сервиса: JSON-файл как база, переменные окружения поверх.
//!
//! Файл по умолчанию — ~/.churnguard/config.json (если есть).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub registry_endpoint: String,
    pub model_name: String,
    pub offline_mode: bool,
    pub drift_threshold: f64,
    pub reference_data_uri: String,
    pub current_data_uri: String,
    pub registry_timeout_secs: u64,
    pub bind_addr: String,
    /// 0 — периодический refresh выключен.
    pub model_refresh_secs: u64,
    pub drift_report_path: PathBuf,
    pub drift_interval_secs: u64,
    pub training_command: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry_endpoint: "http://localhost:5000".to_string(),
            model_name: "telco_churn_model".to_string(),
            offline_mode: false,
            drift_threshold: 0.3,
            reference_data_uri: "data/reference.csv".to_string(),
            current_data_uri: "data/latest_window.csv".to_string(),
            registry_timeout_secs: 5,
            bind_addr: "0.0.0.0:8000".to_string(),
            model_refresh_secs: 0,
            drift_report_path: PathBuf::from("reports/drift_report.json"),
            drift_interval_secs: 86_400,
            training_command: "python src/training/train.py".to_string(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".churnguard")
        .join(CONFIG_FILE)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

impl ServiceConfig {
    /// Явный путь обязан существовать; путь по умолчанию — нет.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file_json = match explicit {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?),
            None => std::fs::read_to_string(default_config_path()).ok(),
        };
        Self::from_sources(file_json.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        file_json: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match file_json {
            Some(s) => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?,
            None => ServiceConfig::default(),
        };

        if let Some(v) = env("MLFLOW_TRACKING_URI") {
            config.registry_endpoint = v;
        }
        if let Some(v) = env("MODEL_NAME") {
            config.model_name = v;
        }
        if let Some(v) = env("MLFLOW_OFFLINE") {
            config.offline_mode = parse_bool("MLFLOW_OFFLINE", &v)?;
        }
        if let Some(v) = env("DRIFT_THRESHOLD") {
            config.drift_threshold = parse_num("DRIFT_THRESHOLD", &v)?;
        }
        if let Some(v) = env("REFERENCE_DATA_URI") {
            config.reference_data_uri = v;
        }
        if let Some(v) = env("CURRENT_DATA_URI") {
            config.current_data_uri = v;
        }
        if let Some(v) = env("REGISTRY_TIMEOUT_SECS") {
            config.registry_timeout_secs = parse_num("REGISTRY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = env("CHURN_BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = env("MODEL_REFRESH_SECS") {
            config.model_refresh_secs = parse_num("MODEL_REFRESH_SECS", &v)?;
        }
        if let Some(v) = env("DRIFT_REPORT_PATH") {
            config.drift_report_path = PathBuf::from(v);
        }
        if let Some(v) = env("DRIFT_INTERVAL_SECS") {
            config.drift_interval_secs = parse_num("DRIFT_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = env("TRAINING_COMMAND") {
            config.training_command = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.drift_threshold.is_nan() || !(0.0..=1.0).contains(&self.drift_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "drift_threshold",
                value: self.drift_threshold.to_string(),
            });
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model_name",
                value: self.model_name.clone(),
            });
        }
        if self.registry_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "registry_timeout_secs",
                value: "0".to_string(),
            });
        }
        if self.drift_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "drift_interval_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }
}
