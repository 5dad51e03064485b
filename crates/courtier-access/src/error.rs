//! Access control error types.

use courtier_core::error::CoreError;
use courtier_core::models::permission::{Action, Module};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("permission store unavailable: {0}")]
    Store(String),

    #[error("permission denied: {module}:{action}")]
    Denied { module: Module, action: Action },
}

impl From<CoreError> for AccessError {
    fn from(err: CoreError) -> Self {
        AccessError::Store(err.to_string())
    }
}

impl From<AccessError> for CoreError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Store(msg) => CoreError::Database(msg),
            AccessError::Denied { .. } => CoreError::AuthorizationDenied {
                reason: err.to_string(),
            },
        }
    }
}
