//! ModelResolver — выбор модели по цепочке fallback.
//!
//! offline → Production-версия → последняя версия любой стадии → статическая модель.
//! resolve() не возвращает ошибок: любой сбой реестра превращается в fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use churn_model::ModelReference;
use model_registry::{ModelRegistry, RegistryError, PRODUCTION_STAGE};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cell::ModelCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Явный offline-режим: реестр не опрашивался.
    Offline,
    Production,
    LatestUnstaged,
    /// Реестр недоступен, пуст или вернул мусор.
    StaticFallback,
}

/// Результат выбора: модель, уровень цепочки и причина для логов.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub reference: ModelReference,
    pub tier: ResolutionTier,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Installed { generation: u64 },
    /// Текущая модель оставлена: та же версия или реестр не дал новой.
    Kept { generation: u64 },
}

pub struct ModelResolver {
    registry: Option<Arc<dyn ModelRegistry>>,
    offline_mode: bool,
    call_timeout: Duration,
}

impl ModelResolver {
    pub fn new(registry: Arc<dyn ModelRegistry>, offline_mode: bool, call_timeout: Duration) -> Self {
        Self {
            registry: Some(registry),
            offline_mode,
            call_timeout,
        }
    }

    /// Резолвер без реестра (клиент не собрался). Всегда отдаёт статическую модель.
    pub fn without_registry(offline_mode: bool) -> Self {
        Self {
            registry: None,
            offline_mode,
            call_timeout: Duration::ZERO,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline_mode
    }

    pub async fn resolve(&self, model_name: &str) -> Resolution {
        if self.offline_mode {
            info!(model = %model_name, tier = ?ResolutionTier::Offline, "offline mode, registry skipped");
            return Resolution {
                reference: ModelReference::static_fallback(),
                tier: ResolutionTier::Offline,
                reason: "offline mode enabled".to_string(),
            };
        }

        let Some(registry) = self.registry.as_ref() else {
            warn!(model = %model_name, "registry client not configured, using static fallback");
            return Resolution {
                reference: ModelReference::static_fallback(),
                tier: ResolutionTier::StaticFallback,
                reason: "registry client not configured".to_string(),
            };
        };

        match self.resolve_from_registry(registry.as_ref(), model_name).await {
            Ok((reference, tier)) => {
                info!(
                    model = %model_name,
                    tier = ?tier,
                    provenance = %reference.provenance(),
                    "model resolved from registry"
                );
                Resolution {
                    reason: format!("resolved {} from {}", reference.provenance(), registry.endpoint()),
                    reference,
                    tier,
                }
            }
            Err(e) => {
                warn!(
                    model = %model_name,
                    registry = %registry.endpoint(),
                    error = %e,
                    "registry resolution failed, using static fallback"
                );
                Resolution {
                    reference: ModelReference::static_fallback(),
                    tier: ResolutionTier::StaticFallback,
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn resolve_reference(&self, model_name: &str) -> ModelReference {
        self.resolve(model_name).await.reference
    }

    /// Явный refresh: резолвит и ставит результат в ячейку.
    /// Статический fallback не вытесняет уже загруженную модель из реестра.
    pub async fn refresh(&self, model_name: &str, cell: &ModelCell) -> (Resolution, RefreshOutcome) {
        let resolution = self.resolve(model_name).await;
        let current = cell.load();
        let current_ref = current.reference();

        let keep = current_ref.provenance() == resolution.reference.provenance()
            || (resolution.tier == ResolutionTier::StaticFallback && !current_ref.is_static_fallback());
        if keep {
            debug!(
                model = %model_name,
                provenance = %current_ref.provenance(),
                tier = ?resolution.tier,
                "refresh kept current model"
            );
            return (
                resolution,
                RefreshOutcome::Kept {
                    generation: current.generation(),
                },
            );
        }

        let generation = cell.install(resolution.reference.clone());
        info!(
            model = %model_name,
            previous = %current_ref.provenance(),
            provenance = %resolution.reference.provenance(),
            generation,
            "installed refreshed model"
        );
        (resolution, RefreshOutcome::Installed { generation })
    }

    async fn resolve_from_registry(
        &self,
        registry: &dyn ModelRegistry,
        model_name: &str,
    ) -> Result<(ModelReference, ResolutionTier), RegistryError> {
        let staged = self
            .bounded(registry.latest_versions(model_name, Some(&[PRODUCTION_STAGE][..])))
            .await?;

        let (version, tier) = match staged.into_iter().next() {
            Some(v) => (v, ResolutionTier::Production),
            None => {
                debug!(model = %model_name, "no production version, trying any stage");
                let any = self.bounded(registry.latest_versions(model_name, None)).await?;
                let v = any
                    .into_iter()
                    .next()
                    .ok_or_else(|| RegistryError::NoRegisteredVersion(model_name.to_string()))?;
                (v, ResolutionTier::LatestUnstaged)
            }
        };

        let handle = self.bounded(registry.load_model(&version)).await?;
        let reference = ModelReference::new(version.provenance(), handle)
            .map_err(|e| RegistryError::Malformed(e.to_string()))?;
        Ok((reference, tier))
    }

    /// Таймаут на один вызов реестра. Просроченный вызов брошен, не повторяется.
    async fn bounded<T, F>(&self, call: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| RegistryError::Timeout(self.call_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use churn_model::{ChurnModel, StaticFallbackModel, STATIC_FALLBACK_PROVENANCE};
    use model_registry::ModelVersion;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn version(v: &str, stage: Option<&str>) -> ModelVersion {
        ModelVersion {
            name: "telco_churn_model".into(),
            version: v.into(),
            current_stage: stage.map(String::from),
            source: format!("runs:/run{}/model", v),
            run_id: None,
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        production: Vec<ModelVersion>,
        any: Vec<ModelVersion>,
        unreachable: bool,
        malformed: bool,
        stall: Option<Duration>,
        broken_artifact: bool,
        calls: AtomicUsize,
        loaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelRegistry for FakeRegistry {
        fn endpoint(&self) -> &str {
            "fake://registry"
        }

        async fn latest_versions(
            &self,
            _model_name: &str,
            stages: Option<&[&str]>,
        ) -> Result<Vec<ModelVersion>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.stall {
                tokio::time::sleep(d).await;
            }
            if self.unreachable {
                return Err(RegistryError::Unavailable("connection refused".into()));
            }
            if self.malformed {
                return Err(RegistryError::Malformed("expected value at line 1 column 1".into()));
            }
            Ok(match stages {
                Some(_) => self.production.clone(),
                None => self.any.clone(),
            })
        }

        async fn load_model(&self, version: &ModelVersion) -> Result<Arc<dyn ChurnModel>, RegistryError> {
            if self.broken_artifact {
                return Err(RegistryError::ArtifactLoad("bad json".into()));
            }
            self.loaded
                .lock()
                .expect("lock")
                .push(version.version.clone());
            Ok(Arc::new(StaticFallbackModel::new()))
        }
    }

    fn resolver(registry: FakeRegistry) -> (ModelResolver, Arc<FakeRegistry>) {
        let registry = Arc::new(registry);
        let resolver = ModelResolver::new(registry.clone(), false, Duration::from_secs(5));
        (resolver, registry)
    }

    #[tokio::test]
    async fn test_production_version_wins() {
        let (resolver, registry) = resolver(FakeRegistry {
            production: vec![version("7", Some("Production")), version("6", Some("Production"))],
            any: vec![version("9", None)],
            ..Default::default()
        });
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::Production);
        assert_eq!(r.reference.provenance(), "models:/telco_churn_model/7");
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*registry.loaded.lock().expect("lock"), vec!["7".to_string()]);
    }

    #[tokio::test]
    async fn test_unstaged_version_when_no_production() {
        let (resolver, _) = resolver(FakeRegistry {
            any: vec![version("3", Some("Staging")), version("2", None)],
            ..Default::default()
        });
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::LatestUnstaged);
        assert_eq!(r.reference.provenance(), "models:/telco_churn_model/3");
        assert!(!r.reference.is_static_fallback());
    }

    #[tokio::test]
    async fn test_empty_registry_falls_back() {
        let (resolver, _) = resolver(FakeRegistry::default());
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert_eq!(r.reference.provenance(), STATIC_FALLBACK_PROVENANCE);
        assert!(r.reason.contains("no registered version"));
    }

    #[tokio::test]
    async fn test_unreachable_registry_falls_back_without_second_query() {
        let (resolver, registry) = resolver(FakeRegistry {
            unreachable: true,
            ..Default::default()
        });
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert_eq!(r.reference.provenance(), STATIC_FALLBACK_PROVENANCE);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_registry_response_falls_back() {
        let (resolver, registry) = resolver(FakeRegistry {
            production: vec![version("7", Some("Production"))],
            malformed: true,
            ..Default::default()
        });
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert_eq!(r.reference.provenance(), STATIC_FALLBACK_PROVENANCE);
        assert!(r.reason.contains("malformed registry response"));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert!(registry.loaded.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_broken_artifact_falls_back() {
        let (resolver, _) = resolver(FakeRegistry {
            production: vec![version("7", Some("Production"))],
            broken_artifact: true,
            ..Default::default()
        });
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert!(r.reason.contains("artifact load failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_registry_times_out_to_fallback() {
        let registry = Arc::new(FakeRegistry {
            production: vec![version("7", Some("Production"))],
            stall: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let resolver = ModelResolver::new(registry, false, Duration::from_secs(2));
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert!(r.reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_offline_mode_skips_registry() {
        let registry = Arc::new(FakeRegistry {
            production: vec![version("7", Some("Production"))],
            ..Default::default()
        });
        let resolver = ModelResolver::new(registry.clone(), true, Duration::from_secs(5));
        let r = resolver.resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::Offline);
        assert_eq!(r.reference.provenance(), STATIC_FALLBACK_PROVENANCE);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_without_registry_falls_back() {
        let r = ModelResolver::without_registry(false).resolve("telco_churn_model").await;
        assert_eq!(r.tier, ResolutionTier::StaticFallback);
        assert_eq!(r.reference.provenance(), STATIC_FALLBACK_PROVENANCE);
    }

    #[tokio::test]
    async fn test_refresh_installs_new_version() {
        let (resolver, _) = resolver(FakeRegistry {
            production: vec![version("8", Some("Production"))],
            ..Default::default()
        });
        let cell = ModelCell::new(ModelReference::static_fallback());
        let (_, outcome) = resolver.refresh("telco_churn_model", &cell).await;
        assert_eq!(outcome, RefreshOutcome::Installed { generation: 2 });
        assert_eq!(cell.load().reference().provenance(), "models:/telco_churn_model/8");

        let (_, again) = resolver.refresh("telco_churn_model", &cell).await;
        assert_eq!(again, RefreshOutcome::Kept { generation: 2 });
    }

    #[tokio::test]
    async fn test_refresh_keeps_registry_model_when_registry_down() {
        let (resolver, _) = resolver(FakeRegistry {
            unreachable: true,
            ..Default::default()
        });
        let held = ModelReference::new("models:/telco_churn_model/5", Arc::new(StaticFallbackModel::new()))
            .expect("provenance");
        let cell = ModelCell::new(held);
        let (resolution, outcome) = resolver.refresh("telco_churn_model", &cell).await;
        assert_eq!(resolution.tier, ResolutionTier::StaticFallback);
        assert_eq!(outcome, RefreshOutcome::Kept { generation: 1 });
        assert_eq!(cell.load().reference().provenance(), "models:/telco_churn_model/5");
    }
}
