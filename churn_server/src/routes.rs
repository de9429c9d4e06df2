//! HTTP: POST /predict, GET /metrics, GET /model, GET /healthz.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use serving_runtime::ServingError;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChurnResponse {
    pub churn_probability: f64,
    pub model_version: String,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_version: String,
    pub generation: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

/// Ошибка сервинга → JSON-ответ. Несовпадение схемы — 422, остальное — 500.
pub struct ApiError(ServingError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ServingError::SchemaMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "schema_mismatch"),
            ServingError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "invalid_body"),
            ServingError::InvalidModelOutput { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_model_output"),
            ServingError::Model(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            ServingError::Metrics(_) => (StatusCode::INTERNAL_SERVER_ERROR, "metrics_error"),
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: kind,
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .route("/model", get(model_info))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Тело разбирается здесь, а не экстрактором: любой отказ отдаётся как JSON и попадает в счётчик.
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChurnResponse>, ApiError> {
    let prediction = match body {
        Ok(Json(value)) => state.predictions.predict_json(value),
        Err(rejection) => Err(state.predictions.reject(rejection.body_text())),
    }
    .map_err(ApiError)?;
    Ok(Json(ChurnResponse {
        churn_probability: prediction.probability,
        model_version: prediction.provenance,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let text = state.predictions.metrics().render().map_err(ApiError)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        text,
    )
        .into_response())
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let snapshot = state.predictions.current();
    Json(ModelInfo {
        model_version: snapshot.reference().provenance().to_string(),
        generation: snapshot.generation(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}
