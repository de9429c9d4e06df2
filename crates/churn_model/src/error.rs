//! Ошибки модели: несовпадение схемы, битый артефакт.

use std::fmt;
use thiserror::Error;

/// Расхождения между записью и схемой модели. Собираются все сразу, не только первое.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaViolation {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    pub wrong_kind: Vec<String>,
}

impl SchemaViolation {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.wrong_kind.is_empty()
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing fields: {}", self.missing.join(", ")));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected fields: {}", self.unexpected.join(", ")));
        }
        if !self.wrong_kind.is_empty() {
            parts.push(format!("wrong value kind: {}", self.wrong_kind.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(SchemaViolation),

    #[error("malformed feature record: {0}")]
    MalformedRecord(String),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("model provenance must not be empty")]
    EmptyProvenance,
}
