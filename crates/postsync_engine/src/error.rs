//! Error types for the sync orchestrator.

use postsync_core::CoreError;
use postsync_reconcile::ReconcileError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failures reported by a transport collaborator.
///
/// Retrying is the transport's business; the orchestrator surfaces these
/// as they are.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with an error status.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP-like status code.
        status: u16,
        /// Error message from the server.
        message: String,
    },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Creates a server error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Returns true if repeating the request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Timeout => true,
            TransportError::Server { status, .. } => *status >= 500,
            TransportError::Unauthorized(_) | TransportError::Malformed(_) => false,
        }
    }
}

/// Errors that end a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching a page failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Loading the snapshot or committing a page failed.
    #[error("store error: {0}")]
    Store(#[from] CoreError),

    /// Reconciliation refused the page.
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// The run was cancelled between pages.
    #[error("sync cancelled")]
    Cancelled,

    /// The blocking apply task did not finish.
    #[error("apply task failed: {0}")]
    ApplyTask(String),

    /// Invalid phase transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current phase.
        from: String,
        /// Attempted phase.
        to: String,
    },
}

impl SyncError {
    /// Returns true if the local data broke a uniqueness invariant.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            SyncError::Reconcile(err) => err.is_invariant_violation(),
            SyncError::Store(err) => err.is_uniqueness_violation(),
            _ => false,
        }
    }

    /// Returns true if the transport reported a retryable failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(err) if err.is_retryable())
    }
}

/// A failed run, with the number of pages that were committed before it
/// stopped.
///
/// Committed pages stay committed; a caller can show partial progress.
#[derive(Error, Debug)]
#[error("sync failed after {pages_applied} applied page(s): {error}")]
pub struct SyncFailure {
    /// Pages committed before the failure.
    pub pages_applied: u32,
    /// What stopped the run.
    #[source]
    pub error: SyncError,
}

impl SyncFailure {
    /// Returns true if the run was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, SyncError::Cancelled)
    }
}
