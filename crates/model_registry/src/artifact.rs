//! Разрешение URI артефакта в локальный путь или HTTP-адрес.

use std::path::PathBuf;

use reqwest::Url;

use crate::error::RegistryError;

/// Имя файла модели внутри директории артефакта.
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Local(PathBuf),
    Remote(Url),
}

fn with_model_file(path: &str) -> String {
    if path.ends_with(".json") {
        path.to_string()
    } else {
        format!("{}/{}", path.trim_end_matches('/'), MODEL_FILE)
    }
}

/// source версии → откуда читать model.json. endpoint нужен для runs:/ и mlflow-artifacts:/.
pub fn locate_artifact(source: &str, endpoint: &str) -> Result<ArtifactLocation, RegistryError> {
    let endpoint = endpoint.trim_end_matches('/');
    let parse = |s: &str| Url::parse(s).map_err(|e| RegistryError::ArtifactLoad(format!("bad url {}: {}", s, e)));

    if let Some(path) = source.strip_prefix("file://") {
        return Ok(ArtifactLocation::Local(PathBuf::from(with_model_file(path))));
    }
    if source.starts_with("http://") || source.starts_with("https://") {
        return parse(&with_model_file(source)).map(ArtifactLocation::Remote);
    }
    if let Some(rest) = source.strip_prefix("runs:/") {
        let rest = rest.trim_start_matches('/');
        let (run_id, path) = rest.split_once('/').unwrap_or((rest, ""));
        if run_id.is_empty() {
            return Err(RegistryError::ArtifactLoad(format!("runs URI without run id: {}", source)));
        }
        let path = with_model_file(path).trim_start_matches('/').to_string();
        let url = Url::parse_with_params(
            &format!("{}/get-artifact", endpoint),
            &[("path", path.as_str()), ("run_uuid", run_id)],
        )
        .map_err(|e| RegistryError::ArtifactLoad(e.to_string()))?;
        return Ok(ArtifactLocation::Remote(url));
    }
    if let Some(path) = source.strip_prefix("mlflow-artifacts:") {
        let path = with_model_file(path.trim_start_matches('/'));
        return parse(&format!("{}/api/2.0/mlflow-artifacts/artifacts/{}", endpoint, path))
            .map(ArtifactLocation::Remote);
    }
    if source.contains("://") || source.starts_with("models:") {
        return Err(RegistryError::ArtifactLoad(format!("unsupported artifact URI: {}", source)));
    }
    if source.trim().is_empty() {
        return Err(RegistryError::Malformed("version has empty source".into()));
    }
    Ok(ArtifactLocation::Local(PathBuf::from(with_model_file(source))))
}
