//! Ошибки реестра. Ни одна не доходит до HTTP-клиента сервиса — их поглощает резолвер.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed registry response: {0}")]
    Malformed(String),

    #[error("no registered version for model '{0}'")]
    NoRegisteredVersion(String),

    #[error("artifact load failed: {0}")]
    ArtifactLoad(String),
}
