//! MonitorCycle — один цикл мониторинга и периодический запуск.
//!
//! Битый отчёт прерывает цикл без решения: «неизвестно» значит «не переобучать».

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::dataset::load_dataset;
use crate::decider::{RetrainDecider, RetrainDecision};
use crate::decision_log::{append_decision_event, DecisionEvent};
use crate::error::DriftError;
use crate::evaluator::{write_report, DriftEvaluator, DriftReport};
use crate::launcher::TrainingLauncher;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub reference_data_uri: String,
    pub current_data_uri: String,
    pub report_path: PathBuf,
}

impl MonitorSettings {
    /// Журнал решений лежит рядом с отчётом.
    pub fn log_dir(&self) -> PathBuf {
        match self.report_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub report: DriftReport,
    pub decision: RetrainDecision,
    pub training_launched: bool,
}

pub struct MonitorCycle {
    settings: MonitorSettings,
    evaluator: DriftEvaluator,
    decider: RetrainDecider,
    launcher: Arc<dyn TrainingLauncher>,
    http_client: reqwest::Client,
}

impl MonitorCycle {
    pub fn new(
        settings: MonitorSettings,
        evaluator: DriftEvaluator,
        decider: RetrainDecider,
        launcher: Arc<dyn TrainingLauncher>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            settings,
            evaluator,
            decider,
            launcher,
            http_client,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub async fn run_once(&self) -> Result<CycleOutcome, DriftError> {
        let report = match self.evaluate().await {
            Ok(r) => r,
            Err(e) => return Err(self.abort(e).await),
        };

        if let Err(e) = write_report(&report, &self.settings.report_path).await {
            warn!(path = %self.settings.report_path.display(), error = %e, "drift report not saved");
        }

        Ok(self.act_on_report(report).await)
    }

    /// Цикл по готовому отчёту (посчитан внешним инструментом): без загрузки датасетов.
    pub async fn run_from_report_file(&self, path: &Path) -> Result<CycleOutcome, DriftError> {
        let report = match DriftEvaluator::evaluate_report_file(path).await {
            Ok(r) => r,
            Err(e) => return Err(self.abort(e).await),
        };
        info!(path = %path.display(), drift_share = report.drift_share(), "drift report loaded");
        Ok(self.act_on_report(report).await)
    }

    /// Решение, запуск обучения при необходимости, запись в журнал.
    /// Сбой запуска логируется и отражается в training_launched, наружу не выходит.
    pub async fn act_on_report(&self, report: DriftReport) -> CycleOutcome {
        let decision = self.decider.decide(&report);
        info!(
            should_retrain = decision.should_retrain,
            reason = %decision.reason,
            "retrain decision"
        );

        let training_launched = decision.should_retrain && self.launch_training();
        record(
            &self.settings.log_dir(),
            &DecisionEvent::Decision {
                drift_share: report.drift_share(),
                threshold: self.decider.threshold(),
                should_retrain: decision.should_retrain,
                reason: decision.reason.clone(),
                training_launched,
            },
        )
        .await;

        CycleOutcome {
            report,
            decision,
            training_launched,
        }
    }

    /// Запускает циклы с периодом period. Ошибка цикла не останавливает расписание.
    pub async fn run_periodic(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "drift cycle failed, next attempt on schedule");
            }
        }
    }

    async fn evaluate(&self) -> Result<DriftReport, DriftError> {
        let reference = load_dataset(&self.settings.reference_data_uri, &self.http_client).await?;
        let current = load_dataset(&self.settings.current_data_uri, &self.http_client).await?;
        self.evaluator.evaluate(&reference, &current)
    }

    async fn abort(&self, e: DriftError) -> DriftError {
        error!(error = %e, "monitoring cycle aborted, no retrain decision");
        record(&self.settings.log_dir(), &DecisionEvent::Aborted { reason: e.to_string() }).await;
        e
    }

    fn launch_training(&self) -> bool {
        match self.launcher.launch() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "training pipeline did not start");
                false
            }
        }
    }
}

async fn record(dir: &Path, event: &DecisionEvent) {
    if let Err(e) = append_decision_event(dir, event).await {
        warn!(dir = %dir.display(), error = %e, "decision log append failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::{ColumnDriftComputation, DriftComputation};
    use crate::dataset::Dataset;
    use crate::decision_log::read_decision_events;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLauncher {
        launches: AtomicUsize,
        fail: bool,
    }

    impl TrainingLauncher for CountingLauncher {
        fn launch(&self) -> Result<(), DriftError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DriftError::TrainingPipelineLaunchFailure("spawn failed".into()));
            }
            Ok(())
        }
    }

    struct FixedShare(Value);

    impl DriftComputation for FixedShare {
        fn compute(&self, _r: &Dataset, _c: &Dataset) -> Result<Value, DriftError> {
            Ok(self.0.clone())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: MonitorSettings,
    }

    fn fixture(reference: &str, current: &str) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let ref_path = dir.path().join("reference.csv");
        let cur_path = dir.path().join("current.csv");
        std::fs::write(&ref_path, reference).expect("write reference");
        std::fs::write(&cur_path, current).expect("write current");
        let settings = MonitorSettings {
            reference_data_uri: ref_path.display().to_string(),
            current_data_uri: cur_path.display().to_string(),
            report_path: dir.path().join("reports").join("drift_report.json"),
        };
        Fixture { _dir: dir, settings }
    }

    fn cycle(settings: MonitorSettings, computation: Arc<dyn DriftComputation>, launcher: Arc<CountingLauncher>) -> MonitorCycle {
        MonitorCycle::new(
            settings,
            DriftEvaluator::new(computation),
            RetrainDecider::new(0.3).expect("threshold"),
            launcher,
            reqwest::Client::new(),
        )
    }

    const CSV: &str = "customerID,tenure\na,1\nb,2\n";

    #[tokio::test]
    async fn test_high_drift_launches_training() {
        let fx = fixture(CSV, CSV);
        let launcher = Arc::new(CountingLauncher::default());
        let computation = Arc::new(FixedShare(json!({"metrics": [{"result": {"drift_share": 0.42}}]})));
        let outcome = cycle(fx.settings.clone(), computation, launcher.clone())
            .run_once()
            .await
            .expect("cycle completes");
        assert!(outcome.decision.should_retrain);
        assert!(outcome.training_launched);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert!(fx.settings.report_path.exists());

        let events = read_decision_events(&fx.settings.log_dir()).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, DecisionEvent::Decision { training_launched: true, .. }));
    }

    #[tokio::test]
    async fn test_low_drift_does_not_launch() {
        let fx = fixture(CSV, CSV);
        let launcher = Arc::new(CountingLauncher::default());
        let outcome = cycle(fx.settings.clone(), Arc::new(ColumnDriftComputation::default()), launcher.clone())
            .run_once()
            .await
            .expect("cycle completes");
        assert_eq!(outcome.report.drift_share(), 0.0);
        assert!(!outcome.decision.should_retrain);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_report_aborts_without_launch() {
        let fx = fixture(CSV, CSV);
        let launcher = Arc::new(CountingLauncher::default());
        let computation = Arc::new(FixedShare(json!({"metrics": [{"result": {"drift_share": 1.5}}]})));
        let result = cycle(fx.settings.clone(), computation, launcher.clone()).run_once().await;
        assert!(matches!(result, Err(DriftError::MalformedDriftReport(_))));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
        assert!(!fx.settings.report_path.exists());

        let events = read_decision_events(&fx.settings.log_dir()).await;
        assert!(matches!(events.as_slice(), [line] if matches!(line.event, DecisionEvent::Aborted { .. })));
    }

    #[tokio::test]
    async fn test_launch_failure_does_not_fail_cycle() {
        let fx = fixture(CSV, CSV);
        let launcher = Arc::new(CountingLauncher {
            fail: true,
            ..Default::default()
        });
        let computation = Arc::new(FixedShare(json!({"metrics": [{"result": {"drift_share": 0.9}}]})));
        let outcome = cycle(fx.settings.clone(), computation, launcher.clone())
            .run_once()
            .await
            .expect("decision still completes");
        assert!(outcome.decision.should_retrain);
        assert!(!outcome.training_launched);
    }

    #[tokio::test]
    async fn test_report_file_with_failing_launcher_still_decides_and_logs() {
        let fx = fixture(CSV, CSV);
        let report_file = fx._dir.path().join("external_report.json");
        std::fs::write(&report_file, r#"{"metrics":[{"result":{"drift_share":0.9}}]}"#).expect("write report");
        let launcher = Arc::new(CountingLauncher {
            fail: true,
            ..Default::default()
        });
        let outcome = cycle(fx.settings.clone(), Arc::new(ColumnDriftComputation::default()), launcher.clone())
            .run_from_report_file(&report_file)
            .await
            .expect("launch failure is not an error");
        assert!(outcome.decision.should_retrain);
        assert!(!outcome.training_launched);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

        let events = read_decision_events(&fx.settings.log_dir()).await;
        assert!(matches!(
            events.as_slice(),
            [line] if matches!(line.event, DecisionEvent::Decision { should_retrain: true, training_launched: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_report_file_aborts_and_logs() {
        let fx = fixture(CSV, CSV);
        let report_file = fx._dir.path().join("external_report.json");
        std::fs::write(&report_file, r#"{"metrics":[{"result":{"drift_share":1.5}}]}"#).expect("write report");
        let launcher = Arc::new(CountingLauncher::default());
        let result = cycle(fx.settings.clone(), Arc::new(ColumnDriftComputation::default()), launcher.clone())
            .run_from_report_file(&report_file)
            .await;
        assert!(matches!(result, Err(DriftError::MalformedDriftReport(_))));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);

        let events = read_decision_events(&fx.settings.log_dir()).await;
        assert!(matches!(events.as_slice(), [line] if matches!(line.event, DecisionEvent::Aborted { .. })));
    }

    #[tokio::test]
    async fn test_missing_dataset_aborts() {
        let fx = fixture(CSV, CSV);
        let mut settings = fx.settings.clone();
        settings.current_data_uri = "/definitely/not/here.csv".into();
        let launcher = Arc::new(CountingLauncher::default());
        let result = cycle(settings, Arc::new(ColumnDriftComputation::default()), launcher).run_once().await;
        assert!(matches!(result, Err(DriftError::DatasetLoad { .. })));
    }
}
