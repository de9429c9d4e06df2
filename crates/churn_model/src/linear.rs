//! Артефакт из реестра: логистическая модель в JSON (формат churn-linear/v1).
//!
//! One-hot кодирование категорий воспроизводится весами по уровням; уровень без веса — базовый.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::features::{FeatureKind, FeatureRecord, FeatureSchema, FieldSpec};
use crate::traits::{ChurnModel, ProbabilityVector};

pub const ARTIFACT_FORMAT: &str = "churn-linear/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub format: String,
    pub intercept: f64,
    #[serde(default)]
    pub numeric: BTreeMap<String, f64>,
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default = "default_classes")]
    pub classes: Vec<u8>,
    /// Полная схема входа, включая поля с нулевым весом. Пусто — схема из ключей весов.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<FieldSpec>,
}

fn default_classes() -> Vec<u8> {
    vec![0, 1]
}

pub struct LinearChurnModel {
    artifact: LinearArtifact,
    schema: FeatureSchema,
}

impl LinearChurnModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: LinearArtifact = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::InvalidArtifact(format!("parse: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self, ModelError> {
        if artifact.format != ARTIFACT_FORMAT {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported format '{}', expected '{}'",
                artifact.format, ARTIFACT_FORMAT
            )));
        }
        if !matches!(artifact.classes.as_slice(), [0, 1] | [0] | [1]) {
            return Err(ModelError::InvalidArtifact(format!(
                "classes must be [0, 1] or a single class, got {:?}",
                artifact.classes
            )));
        }
        if !artifact.intercept.is_finite() {
            return Err(ModelError::InvalidArtifact("intercept is not finite".into()));
        }
        let mut fields = Vec::new();
        for (name, weight) in &artifact.numeric {
            if !weight.is_finite() {
                return Err(ModelError::InvalidArtifact(format!("weight for '{}' is not finite", name)));
            }
            fields.push(FieldSpec {
                name: name.clone(),
                kind: FeatureKind::Numeric,
            });
        }
        for (name, levels) in &artifact.categorical {
            if artifact.numeric.contains_key(name) {
                return Err(ModelError::InvalidArtifact(format!(
                    "field '{}' is both numeric and categorical",
                    name
                )));
            }
            if levels.values().any(|w| !w.is_finite()) {
                return Err(ModelError::InvalidArtifact(format!("weights for '{}' are not finite", name)));
            }
            fields.push(FieldSpec {
                name: name.clone(),
                kind: FeatureKind::Categorical,
            });
        }
        if !artifact.inputs.is_empty() {
            fields = declared_inputs(&artifact.inputs, &fields)?;
        }
        if fields.is_empty() {
            return Err(ModelError::InvalidArtifact("artifact declares no features".into()));
        }
        Ok(Self {
            artifact,
            schema: FeatureSchema::new(fields),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn logit(&self, features: &FeatureRecord) -> f64 {
        let numeric: f64 = self
            .artifact
            .numeric
            .iter()
            .filter_map(|(name, w)| features.get(name).and_then(|v| v.as_f64()).map(|x| w * x))
            .sum();
        let categorical: f64 = self
            .artifact
            .categorical
            .iter()
            .filter_map(|(name, levels)| {
                features
                    .get(name)
                    .and_then(|v| v.as_str())
                    .and_then(|level| levels.get(level))
            })
            .sum();
        self.artifact.intercept + numeric + categorical
    }
}

/// Явный список входов должен покрывать каждое взвешенное поле с тем же видом.
fn declared_inputs(inputs: &[FieldSpec], weighted: &[FieldSpec]) -> Result<Vec<FieldSpec>, ModelError> {
    for (i, input) in inputs.iter().enumerate() {
        if inputs[..i].iter().any(|f| f.name == input.name) {
            return Err(ModelError::InvalidArtifact(format!("input '{}' declared twice", input.name)));
        }
    }
    for field in weighted {
        match inputs.iter().find(|f| f.name == field.name) {
            None => {
                return Err(ModelError::InvalidArtifact(format!(
                    "weighted field '{}' is missing from inputs",
                    field.name
                )))
            }
            Some(input) if input.kind != field.kind => {
                return Err(ModelError::InvalidArtifact(format!(
                    "input '{}' is declared {:?} but weighted as {:?}",
                    field.name, input.kind, field.kind
                )))
            }
            Some(_) => {}
        }
    }
    Ok(inputs.to_vec())
}

impl ChurnModel for LinearChurnModel {
    fn predict_probability(&self, features: &FeatureRecord) -> Result<ProbabilityVector, ModelError> {
        self.schema.validate(features)?;
        match self.artifact.classes.as_slice() {
            // Вырожденный артефакт: колонка — вероятность класса 1.
            [only] => Ok(ProbabilityVector::new(vec![if *only == 1 { 1.0 } else { 0.0 }])),
            _ => {
                let p = 1.0 / (1.0 + (-self.logit(features)).exp());
                Ok(ProbabilityVector::new(vec![1.0 - p, p]))
            }
        }
    }
}
