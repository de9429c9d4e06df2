//! HTTP-клиент к MLflow Model Registry.
//!
//! Без ретраев: повтор — политика вызывающего (периодический refresh).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use churn_model::{ChurnModel, LinearChurnModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact::{locate_artifact, ArtifactLocation};
use crate::error::RegistryError;
use crate::traits::ModelRegistry;
use crate::types::ModelVersion;

const LATEST_VERSIONS_PATH: &str = "api/2.0/mlflow/registered-models/get-latest-versions";

#[derive(Debug, Serialize)]
struct LatestVersionsRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stages: Option<&'a [&'a str]>,
}

#[derive(Debug, Deserialize)]
struct LatestVersionsResponse {
    // MLflow опускает пустые массивы.
    #[serde(default)]
    model_versions: Vec<ModelVersion>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

pub struct MlflowRegistry {
    endpoint: String,
    http_client: reqwest::Client,
}

impl MlflowRegistry {
    /// timeout ограничивает каждый HTTP-запрос целиком.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(endpoint, http_client))
    }

    pub fn with_client(endpoint: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    async fn fetch_bytes(&self, location: &ArtifactLocation) -> Result<Vec<u8>, RegistryError> {
        match location {
            ArtifactLocation::Local(path) => tokio::fs::read(path)
                .await
                .map_err(|e| RegistryError::ArtifactLoad(format!("read {}: {}", path.display(), e))),
            ArtifactLocation::Remote(url) => {
                let response = self
                    .http_client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(map_transport_error)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(RegistryError::ArtifactLoad(format!("GET {}: status {}", url, status)));
                }
                let bytes = response.bytes().await.map_err(map_transport_error)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> RegistryError {
    if e.is_timeout() {
        RegistryError::Unavailable(format!("timeout: {}", e))
    } else {
        RegistryError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl ModelRegistry for MlflowRegistry {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn latest_versions(
        &self,
        model_name: &str,
        stages: Option<&[&str]>,
    ) -> Result<Vec<ModelVersion>, RegistryError> {
        let url = format!("{}/{}", self.endpoint, LATEST_VERSIONS_PATH);
        let request = LatestVersionsRequest {
            name: model_name,
            stages,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let api_error: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
            let code = api_error.as_ref().and_then(|e| e.error_code.as_deref());
            if code == Some("RESOURCE_DOES_NOT_EXIST") {
                return Err(RegistryError::NoRegisteredVersion(model_name.to_string()));
            }
            let message = api_error
                .and_then(|e| e.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            if status.is_server_error() {
                return Err(RegistryError::Unavailable(format!("status {}: {}", status, message)));
            }
            return Err(RegistryError::Malformed(format!("status {}: {}", status, message)));
        }

        let parsed: LatestVersionsResponse =
            serde_json::from_str(&body).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        debug!(
            model = %model_name,
            stages = ?stages,
            count = parsed.model_versions.len(),
            "registry latest versions"
        );
        Ok(parsed.model_versions)
    }

    async fn load_model(&self, version: &ModelVersion) -> Result<Arc<dyn ChurnModel>, RegistryError> {
        let location = locate_artifact(&version.source, &self.endpoint)?;
        debug!(model = %version.name, version = %version.version, location = ?location, "loading artifact");
        let bytes = self.fetch_bytes(&location).await?;
        let model = LinearChurnModel::from_json(&bytes)
            .map_err(|e| RegistryError::ArtifactLoad(e.to_string()))?;
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_model::FeatureRecord;

    fn version_at(source: String) -> ModelVersion {
        ModelVersion {
            name: "telco_churn_model".into(),
            version: "4".into(),
            current_stage: Some("Production".into()),
            source,
            run_id: None,
        }
    }

    #[tokio::test]
    async fn test_load_local_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = r#"{"format": "churn-linear/v1", "intercept": 0.0, "numeric": {"tenure": 0.0}}"#;
        std::fs::write(dir.path().join("model.json"), artifact).expect("write artifact");

        let registry = MlflowRegistry::new("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let source = format!("file://{}", dir.path().display());
        let model = registry.load_model(&version_at(source)).await.expect("loads");
        let out = model
            .predict_probability(&FeatureRecord::new().with("tenure", 3.0))
            .expect("predicts");
        assert_eq!(out.columns(), &[0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_load_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = MlflowRegistry::new("http://127.0.0.1:9", Duration::from_secs(1)).expect("client");
        let source = dir.path().join("absent").display().to_string();
        let err = registry.load_model(&version_at(source)).await.err().expect("must fail");
        assert!(matches!(err, RegistryError::ArtifactLoad(_)));
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_unavailable() {
        // Порт 9 (discard) на localhost обычно закрыт — соединение отклоняется сразу.
        let registry = MlflowRegistry::new("http://127.0.0.1:9", Duration::from_millis(500)).expect("client");
        let err = registry
            .latest_versions("telco_churn_model", Some(&["Production"][..]))
            .await
            .err()
            .expect("must fail");
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }

    mod stub {
        use std::sync::{Arc, Mutex};

        use axum::extract::State;
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};
        use serde_json::Value;

        use super::super::LATEST_VERSIONS_PATH;

        /// Реестр-заглушка: один фиксированный ответ и журнал тел запросов.
        #[derive(Clone)]
        pub struct StubRegistry {
            status: StatusCode,
            body: &'static str,
            pub requests: Arc<Mutex<Vec<Value>>>,
        }

        async fn latest_versions(State(stub): State<StubRegistry>, Json(request): Json<Value>) -> (StatusCode, String) {
            stub.requests.lock().expect("lock").push(request);
            (stub.status, stub.body.to_string())
        }

        /// Поднимает заглушку на свободном порту, возвращает её endpoint.
        pub async fn spawn(status: StatusCode, body: &'static str) -> (String, StubRegistry) {
            let stub = StubRegistry {
                status,
                body,
                requests: Arc::new(Mutex::new(Vec::new())),
            };
            let app = Router::new()
                .route(&format!("/{}", LATEST_VERSIONS_PATH), post(latest_versions))
                .with_state(stub.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("local addr");
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            (format!("http://{}", addr), stub)
        }
    }

    async fn query(
        status: axum::http::StatusCode,
        body: &'static str,
        stages: Option<&[&str]>,
    ) -> (Result<Vec<ModelVersion>, RegistryError>, stub::StubRegistry) {
        let (endpoint, stub) = stub::spawn(status, body).await;
        let http_client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("client");
        let registry = MlflowRegistry::with_client(endpoint, http_client);
        (registry.latest_versions("telco_churn_model", stages).await, stub)
    }

    const TWO_VERSIONS: &str = r#"{"model_versions": [
        {"name": "telco_churn_model", "version": "7", "current_stage": "Production", "source": "runs:/abc/model", "run_id": "abc"},
        {"name": "telco_churn_model", "version": "6", "current_stage": "Production", "source": "runs:/def/model"}
    ]}"#;

    #[tokio::test]
    async fn test_stage_query_sends_stages_and_keeps_registry_order() {
        let (result, stub) = query(axum::http::StatusCode::OK, TWO_VERSIONS, Some(&["Production"][..])).await;
        let versions = result.expect("parsed");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, "7");
        assert_eq!(versions[0].run_id.as_deref(), Some("abc"));
        assert_eq!(versions[1].run_id, None);

        let requests = stub.requests.lock().expect("lock");
        assert_eq!(requests[0]["name"], "telco_churn_model");
        assert_eq!(requests[0]["stages"], serde_json::json!(["Production"]));
    }

    #[tokio::test]
    async fn test_unstaged_query_omits_stages() {
        let (result, stub) = query(axum::http::StatusCode::OK, "{}", None).await;
        assert!(result.expect("parsed").is_empty());
        let requests = stub.requests.lock().expect("lock");
        assert!(requests[0].get("stages").is_none(), "{:?}", requests[0]);
    }

    #[tokio::test]
    async fn test_resource_does_not_exist_is_no_registered_version() {
        let body = r#"{"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "Registered Model with name=telco_churn_model not found"}"#;
        let (result, _) = query(axum::http::StatusCode::NOT_FOUND, body, None).await;
        assert!(matches!(result, Err(RegistryError::NoRegisteredVersion(name)) if name == "telco_churn_model"));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let (result, _) = query(axum::http::StatusCode::SERVICE_UNAVAILABLE, "upstream down", None).await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_client_error_is_malformed() {
        let body = r#"{"error_code": "INVALID_PARAMETER_VALUE", "message": "bad stage"}"#;
        let (result, _) = query(axum::http::StatusCode::BAD_REQUEST, body, None).await;
        match result {
            Err(RegistryError::Malformed(detail)) => assert!(detail.contains("bad stage"), "{detail}"),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_malformed() {
        let (result, _) = query(axum::http::StatusCode::OK, "<html>proxy login</html>", None).await;
        assert!(matches!(result, Err(RegistryError::Malformed(_))));
        let (result, _) = query(axum::http::StatusCode::OK, r#"{"model_versions": [{"name": 1}]}"#, None).await;
        assert!(matches!(result, Err(RegistryError::Malformed(_))));
    }

    #[test]
    fn test_decode_empty_response() {
        let parsed: LatestVersionsResponse = serde_json::from_str("{}").expect("valid");
        assert!(parsed.model_versions.is_empty());
    }
}
