//! Протокол реестра, который потребляет резолвер.

use std::sync::Arc;

use async_trait::async_trait;
use churn_model::ChurnModel;

use crate::error::RegistryError;
use crate::types::ModelVersion;

#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Адрес реестра для логов.
    fn endpoint(&self) -> &str;

    /// Последние версии модели. stages = None — без фильтра по стадии.
    /// Порядок — как отдал реестр.
    async fn latest_versions(
        &self,
        model_name: &str,
        stages: Option<&[&str]>,
    ) -> Result<Vec<ModelVersion>, RegistryError>;

    /// Загружает артефакт версии и строит модель.
    async fn load_model(&self, version: &ModelVersion) -> Result<Arc<dyn ChurnModel>, RegistryError>;
}
