//! Unified error handling for the sync runtime.

use crate::transport::TransportError;

/// Errors surfaced by a sync cycle.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("engine error: {0}")]
    Engine(#[from] liftlog_engine::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// Check whether retrying the same batch later can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Engine(_) => false,
            SyncError::Transport(err) => err.is_transient(),
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
