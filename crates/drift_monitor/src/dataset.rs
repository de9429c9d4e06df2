//! Табличные датасеты (CSV с заголовком) из локального или удалённого хранилища.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::error::DriftError;

const GCS_PUBLIC_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(|v| v.trim().to_string()).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Непустые значения колонки.
    pub fn column_values(&self, name: &str) -> Vec<&str> {
        let Some(idx) = self.columns.iter().position(|c| c == name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Проверка, что набор колонок совпадает (порядок не важен).
    pub fn check_same_schema(&self, other: &Dataset) -> Result<(), DriftError> {
        let mine: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.columns.iter().map(String::as_str).collect();
        if mine == theirs {
            return Ok(());
        }
        Err(DriftError::DatasetSchemaMismatch {
            only_reference: mine.difference(&theirs).copied().collect::<Vec<_>>().join(", "),
            only_current: theirs.difference(&mine).copied().collect::<Vec<_>>().join(", "),
        })
    }
}

/// Откуда читать датасет.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Local(PathBuf),
    Http(String),
}

impl DatasetSource {
    /// Путь, file://, http(s):// и gs://bucket/object (через публичный HTTP-эндпоинт хранилища).
    pub fn parse(uri: &str) -> Result<Self, DriftError> {
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(DatasetSource::Local(PathBuf::from(path)));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(DatasetSource::Http(uri.to_string()));
        }
        if let Some(rest) = uri.strip_prefix("gs://") {
            let (bucket, object) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() || object.is_empty() {
                return Err(DriftError::DatasetLoad {
                    uri: uri.to_string(),
                    reason: "expected gs://bucket/object".to_string(),
                });
            }
            return Ok(DatasetSource::Http(format!("{}/{}/{}", GCS_PUBLIC_ENDPOINT, bucket, object)));
        }
        if uri.contains("://") || uri.trim().is_empty() {
            return Err(DriftError::DatasetLoad {
                uri: uri.to_string(),
                reason: "unsupported URI scheme".to_string(),
            });
        }
        Ok(DatasetSource::Local(PathBuf::from(uri)))
    }
}

pub async fn load_dataset(uri: &str, http_client: &reqwest::Client) -> Result<Dataset, DriftError> {
    let load_err = |reason: String| DriftError::DatasetLoad {
        uri: uri.to_string(),
        reason,
    };
    let bytes = match DatasetSource::parse(uri)? {
        DatasetSource::Local(path) => tokio::fs::read(&path)
            .await
            .map_err(|e| load_err(format!("read {}: {}", path.display(), e)))?,
        DatasetSource::Http(url) => {
            let response = http_client
                .get(&url)
                .send()
                .await
                .map_err(|e| load_err(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(load_err(format!("GET {}: status {}", url, status)));
            }
            response.bytes().await.map_err(|e| load_err(e.to_string()))?.to_vec()
        }
    };
    let dataset = Dataset::from_csv_bytes(&bytes).map_err(|e| load_err(format!("csv: {}", e)))?;
    debug!(uri = %uri, rows = dataset.row_count(), columns = dataset.columns().len(), "dataset loaded");
    Ok(dataset)
}
