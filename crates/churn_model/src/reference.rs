//! ModelReference — модель плюс её provenance. Не мутируется, только заменяется целиком.

use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;
use crate::fallback::{StaticFallbackModel, STATIC_FALLBACK_PROVENANCE};
use crate::traits::ChurnModel;

#[derive(Clone)]
pub struct ModelReference {
    provenance: String,
    handle: Arc<dyn ChurnModel>,
}

impl ModelReference {
    pub fn new(provenance: impl Into<String>, handle: Arc<dyn ChurnModel>) -> Result<Self, ModelError> {
        let provenance = provenance.into();
        if provenance.trim().is_empty() {
            return Err(ModelError::EmptyProvenance);
        }
        Ok(Self { provenance, handle })
    }

    /// Статическая модель с фиксированным provenance.
    pub fn static_fallback() -> Self {
        Self {
            provenance: STATIC_FALLBACK_PROVENANCE.to_string(),
            handle: Arc::new(StaticFallbackModel::new()),
        }
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    pub fn handle(&self) -> &Arc<dyn ChurnModel> {
        &self.handle
    }

    pub fn is_static_fallback(&self) -> bool {
        self.provenance == STATIC_FALLBACK_PROVENANCE
    }
}

impl fmt::Debug for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelReference")
            .field("provenance", &self.provenance)
            .finish_non_exhaustive()
    }
}
