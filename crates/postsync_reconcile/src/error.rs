//! Error types for reconciliation.

use postsync_core::{BlogId, ForeignId, LocalKey, RemotePostId};
use thiserror::Error;

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that abort a reconciliation pass.
///
/// Every variant except [`ReconcileError::Encode`] is an invariant
/// violation: the inputs are inconsistent and no plan can be produced
/// without arbitrarily picking a winner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Two local records own the same remote ID.
    #[error("local records {first} and {second} both own {remote_id} in {blog}")]
    DuplicateLocalRemoteId {
        /// Blog containing both records.
        blog: BlogId,
        /// Contested remote ID.
        remote_id: RemotePostId,
        /// First record seen.
        first: LocalKey,
        /// Second record seen.
        second: LocalKey,
    },

    /// Two remote-less local records share a foreign ID.
    #[error("local records {first} and {second} share foreign ID {foreign_id} in {blog}")]
    DuplicateLocalForeignId {
        /// Blog containing both records.
        blog: BlogId,
        /// Contested foreign ID.
        foreign_id: ForeignId,
        /// First record seen.
        first: LocalKey,
        /// Second record seen.
        second: LocalKey,
    },

    /// The same remote post appears twice in one batch.
    #[error("remote batch lists {remote_id} of {blog} more than once")]
    DuplicateRemoteInBatch {
        /// Blog of the post.
        blog: BlogId,
        /// Repeated remote ID.
        remote_id: RemotePostId,
    },

    /// Two remote posts carry the correlation token of the same draft.
    #[error("draft {target} claimed by both {first} and {second}")]
    DraftClaimedTwice {
        /// The local draft.
        target: LocalKey,
        /// First remote post claiming it.
        first: RemotePostId,
        /// Second remote post claiming it.
        second: RemotePostId,
    },

    /// Conflict payload could not be encoded for digesting.
    #[error("encode error: {0}")]
    Encode(String),
}

impl ReconcileError {
    /// Returns true if the error reports inconsistent inputs.
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, ReconcileError::Encode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_classification() {
        let err = ReconcileError::DuplicateRemoteInBatch {
            blog: BlogId::new(1),
            remote_id: RemotePostId::new(7),
        };
        assert!(err.is_invariant_violation());
        assert_eq!(err.to_string(), "remote batch lists post:7 of blog:1 more than once");
        assert!(!ReconcileError::Encode("eof".into()).is_invariant_violation());
    }
}
