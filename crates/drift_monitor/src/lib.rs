//! Drift Monitor — сравнение эталонных данных с текущим окном и решение о переобучении.
//!
//! Цикл: datasets → DriftEvaluator → DriftReport → RetrainDecider → TrainingLauncher.
//! Не трогает модель в сервинге: новая версия видна только после следующего resolve.

mod computation;
mod cycle;
mod dataset;
mod decider;
mod decision_log;
mod error;
mod evaluator;
mod launcher;

pub use computation::{ColumnDriftComputation, DriftComputation};
pub use cycle::{CycleOutcome, MonitorCycle, MonitorSettings};
pub use dataset::{load_dataset, Dataset, DatasetSource};
pub use decider::{decide, RetrainDecider, RetrainDecision};
pub use decision_log::{append_decision_event, read_decision_events, DecisionEvent, DecisionLogLine, DECISION_LOG_FILE};
pub use error::DriftError;
pub use evaluator::{write_report, DriftEvaluator, DriftReport};
pub use launcher::{ProcessTrainingLauncher, TrainingLauncher};
