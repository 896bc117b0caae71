use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A named board, list, checklist or project does not exist.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Network or API failure on a call to one of the remote services.
    #[error("{operation} failed: {message}")]
    RemoteCall { operation: String, message: String },

    /// A required configuration value is absent.
    #[error("missing configuration value: {0}")]
    ConfigMissing(String),
}

impl SyncError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        SyncError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn remote(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        SyncError::RemoteCall {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

/// Turn a failed best-effort call into a logged warning.
///
/// Callers use this where a failure should skip one step for one card rather
/// than abort the card or the run.
pub fn best_effort<T>(operation: &str, result: Result<T, SyncError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "best-effort call failed, skipping");
            None
        }
    }
}
