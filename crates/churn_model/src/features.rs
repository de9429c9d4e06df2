//! Признаки: запись, значение, схема модели.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ModelError, SchemaViolation};

/// Скалярное значение признака: число или категория строкой.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Numeric(_) => FeatureKind::Numeric,
            FeatureValue::Categorical(_) => FeatureKind::Categorical,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Numeric(_) => None,
            FeatureValue::Categorical(s) => Some(s),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Categorical(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Categorical(v)
    }
}

/// Упорядоченная (по имени) запись признаков одного клиента.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(BTreeMap<String, FeatureValue>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-стиль для тестов и клиентов.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Разбор тела запроса. Не-объект — MalformedRecord; поле не числом и не строкой
    /// (null, bool, массив, объект) — SchemaMismatch с этим полем в wrong_kind.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ModelError> {
        let object = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(ModelError::MalformedRecord(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };
        let mut record = Self::new();
        let mut violation = SchemaViolation::default();
        for (name, value) in object {
            match value {
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(x) => record.insert(name, x),
                    None => violation.wrong_kind.push(name),
                },
                serde_json::Value::String(s) => record.insert(name, s),
                _ => violation.wrong_kind.push(name),
            }
        }
        if violation.is_empty() {
            Ok(record)
        } else {
            Err(ModelError::SchemaMismatch(violation))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FeatureKind,
}

/// Схема, на которой обучена модель. Запись должна совпадать с ней полностью.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
}

const TELCO_NUMERIC: &[&str] = &["SeniorCitizen", "tenure", "MonthlyCharges", "TotalCharges"];

const TELCO_FIELDS: &[&str] = &[
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "MonthlyCharges",
    "TotalCharges",
];

impl FeatureSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Запись клиента Telco без customerID и целевой колонки Churn.
    pub fn telco_churn() -> Self {
        let fields = TELCO_FIELDS
            .iter()
            .map(|name| FieldSpec {
                name: (*name).to_string(),
                kind: if TELCO_NUMERIC.contains(name) {
                    FeatureKind::Numeric
                } else {
                    FeatureKind::Categorical
                },
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn validate(&self, record: &FeatureRecord) -> Result<(), ModelError> {
        let mut violation = SchemaViolation::default();
        for field in &self.fields {
            match record.get(&field.name) {
                None => violation.missing.push(field.name.clone()),
                Some(v) if v.kind() != field.kind => violation.wrong_kind.push(field.name.clone()),
                Some(_) => {}
            }
        }
        for (name, _) in record.iter() {
            if self.kind_of(name).is_none() {
                violation.unexpected.push(name.to_string());
            }
        }
        if violation.is_empty() {
            Ok(())
        } else {
            Err(ModelError::SchemaMismatch(violation))
        }
    }
}
