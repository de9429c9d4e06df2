//! Состояние сервиса: ячейка модели, резолвер, сервис предсказаний, метрики.

use std::sync::Arc;

use model_registry::MlflowRegistry;
use serving_runtime::{ModelCell, ModelResolver, PredictionService, Resolution, ServingMetrics};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;

pub struct AppState {
    pub config: ServiceConfig,
    pub resolver: ModelResolver,
    pub cell: Arc<ModelCell>,
    pub predictions: PredictionService,
}

impl AppState {
    /// Резолвер из конфигурации. Клиент реестра не собрался — резолвер без реестра.
    pub fn build_resolver(config: &ServiceConfig) -> ModelResolver {
        if config.offline_mode {
            return ModelResolver::without_registry(true);
        }
        match MlflowRegistry::new(config.registry_endpoint.clone(), config.registry_timeout()) {
            Ok(registry) => ModelResolver::new(Arc::new(registry), false, config.registry_timeout()),
            Err(e) => {
                warn!(endpoint = %config.registry_endpoint, error = %e, "registry client init failed");
                ModelResolver::without_registry(false)
            }
        }
    }

    /// Первичный resolve при старте. Не падает: худший случай — статическая модель.
    pub async fn initialize(config: ServiceConfig, resolver: ModelResolver) -> Result<Self, serving_runtime::ServingError> {
        let Resolution { reference, tier, reason } = resolver.resolve(&config.model_name).await;
        info!(
            model = %config.model_name,
            provenance = %reference.provenance(),
            tier = ?tier,
            reason = %reason,
            "serving model selected"
        );
        let cell = Arc::new(ModelCell::new(reference));
        let metrics = Arc::new(ServingMetrics::new()?);
        let predictions = PredictionService::new(Arc::clone(&cell), metrics);
        Ok(Self {
            config,
            resolver,
            cell,
            predictions,
        })
    }

    pub async fn refresh_model(&self) {
        let (_, outcome) = self.resolver.refresh(&self.config.model_name, &self.cell).await;
        debug!(outcome = ?outcome, "model refresh finished");
    }
}
