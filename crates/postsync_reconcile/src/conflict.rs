//! Conflicts between pending local edits and newer remote content.

use crate::error::{ReconcileError, ReconcileResult};
use postsync_core::{LocalKey, PostFields, PostRecord, RemotePost, RemotePostId, SyncStatus, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Why a matched record counted as holding pending local edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The record has a revision.
    PendingRevision,
    /// Local edits were saved after the remote modification time.
    NewerLocalChanges,
    /// The last upload failed.
    PushFailed,
    /// An upload is queued or in flight.
    UploadInFlight,
}

impl ConflictReason {
    /// Classifies a record against a remote modification time.
    ///
    /// Returns `None` if the record holds no pending local edits.
    pub fn detect(record: &PostRecord, remote_modified: Timestamp) -> Option<Self> {
        if record.has_revision() {
            return Some(ConflictReason::PendingRevision);
        }
        if record
            .confirmed_changes_at
            .is_some_and(|confirmed| confirmed > remote_modified)
        {
            return Some(ConflictReason::NewerLocalChanges);
        }
        match record.sync_status {
            SyncStatus::PushFailed { .. } => Some(ConflictReason::PushFailed),
            SyncStatus::PendingPush | SyncStatus::Pushing => Some(ConflictReason::UploadInFlight),
            SyncStatus::Local | SyncStatus::Synced => None,
        }
    }

    /// Returns the snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::PendingRevision => "pending_revision",
            ConflictReason::NewerLocalChanges => "newer_local_changes",
            ConflictReason::PushFailed => "push_failed",
            ConflictReason::UploadInFlight => "upload_in_flight",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote update that could not be applied in full.
///
/// Recorded so the caller can let the user choose; the local side is kept
/// as it was apart from server-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Local record.
    pub target: LocalKey,
    /// Remote post.
    pub remote_id: RemotePostId,
    /// What made the local side pending.
    pub reason: ConflictReason,
    /// User-visible local content that was preserved.
    pub local_fields: PostFields,
    /// Incoming remote content.
    pub remote_fields: PostFields,
    /// Remote modification time.
    pub remote_modified: Timestamp,
    /// SHA-256 of the local content.
    pub local_hash: [u8; 32],
    /// SHA-256 of the remote content.
    pub remote_hash: [u8; 32],
}

impl Conflict {
    /// Builds a conflict between a record and a remote post.
    pub fn new(
        record: &PostRecord,
        remote: &RemotePost,
        reason: ConflictReason,
    ) -> ReconcileResult<Self> {
        let local_fields = record.latest_fields().clone();
        let remote_fields = remote.fields();
        Ok(Self {
            target: record.local_key,
            remote_id: remote.remote_id,
            reason,
            local_hash: content_hash(&local_fields)?,
            remote_hash: content_hash(&remote_fields)?,
            local_fields,
            remote_fields,
            remote_modified: remote.modified,
        })
    }

    /// Returns true if both sides hold the same content.
    ///
    /// Happens when a pushed edit comes back from the server unchanged.
    pub fn is_identical(&self) -> bool {
        self.local_hash == self.remote_hash
    }
}

/// Hashes post content over its CBOR encoding.
pub fn content_hash(fields: &PostFields) -> ReconcileResult<[u8; 32]> {
    let mut encoded = Vec::new();
    ciborium::into_writer(fields, &mut encoded)
        .map_err(|e| ReconcileError::Encode(e.to_string()))?;
    Ok(Sha256::digest(&encoded).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_core::{BlogId, PostType};

    fn record() -> PostRecord {
        let mut record =
            PostRecord::new_draft(BlogId::new(1), PostType::Post, PostFields::new("Local", ""));
        record
            .confirm_push(RemotePostId::new(5), Timestamp::from_millis(100))
            .unwrap();
        record
    }

    #[test]
    fn synced_record_has_no_pending_edits() {
        assert_eq!(
            ConflictReason::detect(&record(), Timestamp::from_millis(200)),
            None
        );
    }

    #[test]
    fn detect_reasons() {
        let mut with_revision = record();
        with_revision.edit().title = "Edited".into();
        assert_eq!(
            ConflictReason::detect(&with_revision, Timestamp::from_millis(200)),
            Some(ConflictReason::PendingRevision)
        );

        let mut newer = record();
        newer.confirmed_changes_at = Some(Timestamp::from_millis(300));
        assert_eq!(
            ConflictReason::detect(&newer, Timestamp::from_millis(200)),
            Some(ConflictReason::NewerLocalChanges)
        );
        assert_eq!(
            ConflictReason::detect(&newer, Timestamp::from_millis(300)),
            None
        );

        let mut failed = record();
        failed.mark_push_failed("HTTP 500", Timestamp::from_millis(150));
        assert_eq!(
            ConflictReason::detect(&failed, Timestamp::from_millis(200)),
            Some(ConflictReason::PushFailed)
        );

        let mut pushing = record();
        pushing.mark_pushing();
        assert_eq!(
            ConflictReason::detect(&pushing, Timestamp::from_millis(200)),
            Some(ConflictReason::UploadInFlight)
        );
    }

    #[test]
    fn conflict_preserves_both_sides() {
        let mut local = record();
        local.edit().title = "Mine".into();
        let remote = RemotePost::new(
            RemotePostId::new(5),
            BlogId::new(1),
            PostType::Post,
            "Theirs",
            Timestamp::from_millis(200),
        );

        let conflict = Conflict::new(&local, &remote, ConflictReason::PendingRevision).unwrap();
        assert_eq!(conflict.local_fields.title, "Mine");
        assert_eq!(conflict.remote_fields.title, "Theirs");
        assert_eq!(conflict.remote_modified, Timestamp::from_millis(200));
        assert!(!conflict.is_identical());
    }

    #[test]
    fn hash_is_content_addressed() {
        let a = PostFields::new("Same", "body");
        let b = PostFields::new("Same", "body");
        let c = PostFields::new("Other", "body");
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
        assert_ne!(content_hash(&a).unwrap(), content_hash(&c).unwrap());
    }
}
