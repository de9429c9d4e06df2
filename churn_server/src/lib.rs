//! churnguard — сервис вероятности оттока: HTTP, refresh модели, мониторинг дрейфа.

pub mod config;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use drift_monitor::{
    ColumnDriftComputation, DriftError, DriftEvaluator, MonitorCycle, MonitorSettings, ProcessTrainingLauncher,
    RetrainDecider,
};
use tokio::task::JoinHandle;
use tracing::info;

pub use config::{ConfigError, ServiceConfig};
pub use routes::router;
pub use state::AppState;

/// Периодический refresh модели. None — refresh выключен в конфиге.
pub fn spawn_model_refresher(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    if state.config.model_refresh_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(state.config.model_refresh_secs);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // Первый тик мгновенный, а стартовый resolve уже сделан.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.refresh_model().await;
        }
    }))
}

pub fn build_monitor(config: &ServiceConfig) -> Result<MonitorCycle, DriftError> {
    let settings = MonitorSettings {
        reference_data_uri: config.reference_data_uri.clone(),
        current_data_uri: config.current_data_uri.clone(),
        report_path: config.drift_report_path.clone(),
    };
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| DriftError::DatasetLoad {
            uri: config.reference_data_uri.clone(),
            reason: e.to_string(),
        })?;
    Ok(MonitorCycle::new(
        settings,
        DriftEvaluator::new(Arc::new(ColumnDriftComputation::default())),
        RetrainDecider::new(config.drift_threshold)?,
        Arc::new(ProcessTrainingLauncher::from_command_line(&config.training_command)?),
        http_client,
    ))
}

pub async fn serve(config: ServiceConfig, with_drift_monitor: bool) -> anyhow::Result<()> {
    let resolver = AppState::build_resolver(&config);
    let state = Arc::new(AppState::initialize(config, resolver).await?);
    let _refresher = spawn_model_refresher(Arc::clone(&state));

    if with_drift_monitor {
        let monitor = Arc::new(build_monitor(&state.config)?);
        let period = Duration::from_secs(state.config.drift_interval_secs);
        tokio::spawn(monitor.run_periodic(period));
    }

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    info!(addr = %state.config.bind_addr, "churnguard listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
