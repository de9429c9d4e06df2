//! Интерфейс модели: одна возможность — predict_probability.
//!
//! И артефакт из реестра, и статический fallback реализуют один трейт,
//! поэтому сервинг не знает, какая модель сейчас активна.

use crate::error::ModelError;
use crate::features::FeatureRecord;

/// Вероятности классов в каноническом порядке [negative, positive].
///
/// Одна колонка — вырожденная модель (обучена на одном классе). По соглашению
/// такая колонка всегда несёт вероятность положительного класса.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f64>);

impl ProbabilityVector {
    pub fn new(columns: Vec<f64>) -> Self {
        Self(columns)
    }

    pub fn columns(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Вероятность класса 1: единственная колонка как есть, иначе колонка с индексом 1.
    pub fn positive_class(&self) -> Option<f64> {
        match self.0.as_slice() {
            [] => None,
            [only] => Some(*only),
            [_, positive, ..] => Some(*positive),
        }
    }
}

/// Модель оттока, готовая к предсказанию.
pub trait ChurnModel: Send + Sync {
    /// Проверяет запись против своей схемы и возвращает вероятности классов.
    fn predict_probability(&self, features: &FeatureRecord) -> Result<ProbabilityVector, ModelError>;
}
