//! churnguard CLI: serve | drift-check.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use churn_server::{build_monitor, serve, ServiceConfig};
use drift_monitor::{CycleOutcome, DriftError};

#[derive(Parser)]
#[command(name = "churnguard", version, about = "Churn probability service with drift-gated retraining")]
struct Cli {
    /// JSON-конфиг; переменные окружения имеют приоритет.
    #[arg(long, env = "CHURNGUARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// HTTP-сервис предсказаний.
    Serve {
        /// Запускать мониторинг дрейфа по расписанию в том же процессе.
        #[arg(long)]
        with_drift_monitor: bool,
    },
    /// Мониторинг дрейфа: один цикл или по расписанию.
    DriftCheck {
        /// Готовый JSON-отчёт вместо вычисления по датасетам.
        #[arg(long, conflicts_with = "schedule")]
        report: Option<PathBuf>,

        /// Повторять цикл каждые drift_interval_secs.
        #[arg(long)]
        schedule: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        with_drift_monitor: false,
    }) {
        Command::Serve { with_drift_monitor } => serve(config, with_drift_monitor).await,
        Command::DriftCheck { report: Some(path), .. } => {
            let monitor = build_monitor(&config)?;
            finish_cycle(monitor.run_from_report_file(&path).await)
        }
        Command::DriftCheck { report: None, schedule: true } => {
            let monitor = Arc::new(build_monitor(&config)?);
            info!(interval_secs = config.drift_interval_secs, "drift monitor scheduled");
            tokio::select! {
                _ = monitor.run_periodic(Duration::from_secs(config.drift_interval_secs)) => {}
                _ = tokio::signal::ctrl_c() => info!("drift monitor stopped"),
            }
            Ok(())
        }
        Command::DriftCheck { report: None, schedule: false } => {
            let monitor = build_monitor(&config)?;
            finish_cycle(monitor.run_once().await)
        }
    }
}

/// Прерванный цикл уже залогирован и записан в журнал; код выхода ненулевой.
fn finish_cycle(result: Result<CycleOutcome, DriftError>) -> Result<()> {
    let outcome = result?;
    info!(
        drift_share = outcome.report.drift_share(),
        should_retrain = outcome.decision.should_retrain,
        training_launched = outcome.training_launched,
        "drift check finished"
    );
    Ok(())
}
