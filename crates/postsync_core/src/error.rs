//! Error types for postsync core.

use crate::post::{ForeignId, LocalKey};
use crate::types::{BlogId, RemotePostId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in postsync core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A transaction tried to insert a record whose key already exists.
    #[error("record already exists: {key}")]
    RecordExists {
        /// The duplicated local key.
        key: LocalKey,
    },

    /// A transaction referenced a record that does not exist.
    #[error("record not found: {key}")]
    RecordNotFound {
        /// The missing local key.
        key: LocalKey,
    },

    /// Two records would own the same remote ID within a blog.
    #[error("remote ID {remote_id} already owned by {existing} in {blog}")]
    DuplicateRemoteId {
        /// Blog containing both records.
        blog: BlogId,
        /// The contested remote ID.
        remote_id: RemotePostId,
        /// Record that already owns it.
        existing: LocalKey,
    },

    /// Two local-only records would share a foreign ID within a blog.
    #[error("foreign ID {foreign_id} already used by {existing} in {blog}")]
    DuplicateForeignId {
        /// Blog containing both records.
        blog: BlogId,
        /// The contested foreign ID.
        foreign_id: ForeignId,
        /// Record that already uses it.
        existing: LocalKey,
    },

    /// Transaction was aborted.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// Store is already open or locked by another process.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Invalid store format or version.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted in the record's current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if the error reports a broken uniqueness constraint.
    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRemoteId { .. } | Self::DuplicateForeignId { .. }
        )
    }
}
