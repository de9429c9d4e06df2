//! Журнал решений о переобучении: append-only JSONL рядом с отчётом о дрейфе.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

pub const DECISION_LOG_FILE: &str = "decisions.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionEvent {
    Decision {
        drift_share: f64,
        threshold: f64,
        should_retrain: bool,
        reason: String,
        training_launched: bool,
    },
    /// Цикл прерван до решения (битый отчёт, нет данных).
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogLine {
    pub timestamp: String,
    #[serde(flatten)]
    pub event: DecisionEvent,
}

/// Дописывает событие в dir/decisions.jsonl.
pub async fn append_decision_event(dir: &Path, event: &DecisionEvent) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let line = DecisionLogLine {
        timestamp: chrono::Utc::now().to_rfc3339(),
        event: event.clone(),
    };
    let mut json = serde_json::to_string(&line).map_err(std::io::Error::other)?;
    json.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(DECISION_LOG_FILE))
        .await?;
    file.write_all(json.as_bytes()).await?;
    file.flush().await
}

/// Читает журнал; битые строки пропускаются.
pub async fn read_decision_events(dir: &Path) -> Vec<DecisionLogLine> {
    let path = dir.join(DECISION_LOG_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}
