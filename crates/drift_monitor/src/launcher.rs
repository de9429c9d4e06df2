//! Запуск пайплайна обучения: fire-and-forget, исход не отслеживается.

use std::process::Stdio;

use tracing::info;

use crate::error::DriftError;

pub trait TrainingLauncher: Send + Sync {
    /// Ошибка — только если процесс не стартовал.
    fn launch(&self) -> Result<(), DriftError>;
}

/// Внешний процесс из командной строки конфигурации (без shell).
#[derive(Debug, Clone)]
pub struct ProcessTrainingLauncher {
    program: String,
    args: Vec<String>,
}

impl ProcessTrainingLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// "python src/training/train.py" → program + args по пробелам.
    pub fn from_command_line(command: &str) -> Result<Self, DriftError> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| DriftError::TrainingPipelineLaunchFailure("empty training command".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl TrainingLauncher for ProcessTrainingLauncher {
    /// Вызывается внутри tokio runtime: завершившийся процесс подбирает runtime.
    fn launch(&self) -> Result<(), DriftError> {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| DriftError::TrainingPipelineLaunchFailure(format!("{}: {}", self.program, e)))?;
        info!(program = %self.program, pid = ?child.id(), "training pipeline launched");
        drop(child);
        Ok(())
    }
}
