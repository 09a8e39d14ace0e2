//! The versioned post record.

use crate::error::{CoreError, CoreResult};
use crate::post::fields::{AutosaveSnapshot, PostFields};
use crate::post::id::{ForeignId, LocalKey};
use crate::post::status::SyncStatus;
use crate::types::{deserialize_optional_remote_id, BlogId, PostType, RemotePostId, Timestamp};
use serde::{Deserialize, Serialize};

/// In-progress local edits layered over a record's canonical fields.
///
/// A record owns at most one revision. The revision is created lazily on
/// the first edit and discarded once its content has been pushed and
/// folded back into the canonical fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Edited content.
    pub fields: PostFields,
    /// When the revision was started.
    pub created_at: Timestamp,
    /// When the user saved the revision, if they did.
    pub saved_at: Option<Timestamp>,
}

impl Revision {
    /// Returns true if the user saved this revision and it awaits upload.
    pub fn is_saved(&self) -> bool {
        self.saved_at.is_some()
    }
}

/// A post as held in the local store.
///
/// # Identity
///
/// - `local_key` identifies the record locally and never changes
/// - `remote_id`, once assigned, is unique per blog and never reverts
/// - `foreign_id` identifies records without a `remote_id` within a blog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Local identity.
    pub local_key: LocalKey,
    /// Owning blog.
    pub blog: BlogId,
    /// Post or page.
    pub post_type: PostType,
    /// Server identity, absent until the post is uploaded or matched.
    #[serde(default, deserialize_with = "deserialize_optional_remote_id")]
    pub remote_id: Option<RemotePostId>,
    /// Correlation token for drafts created on this device.
    pub foreign_id: Option<ForeignId>,
    /// Position relative to the server.
    pub sync_status: SyncStatus,
    /// Canonical content.
    pub fields: PostFields,
    /// Server modification time of the last remote version folded in.
    pub remote_modified: Option<Timestamp>,
    /// Pending local edits.
    pub revision: Option<Revision>,
    /// Last server-side autosave known for this post.
    pub autosave: Option<AutosaveSnapshot>,
    /// Last time local edits were durably saved by the user.
    pub confirmed_changes_at: Option<Timestamp>,
    /// When the record was created locally.
    pub created_at: Timestamp,
}

impl PostRecord {
    /// Creates a new local draft with a fresh foreign ID.
    pub fn new_draft(blog: BlogId, post_type: PostType, fields: PostFields) -> Self {
        Self {
            local_key: LocalKey::new(),
            blog,
            post_type,
            remote_id: None,
            foreign_id: Some(ForeignId::new()),
            sync_status: SyncStatus::Local,
            fields,
            remote_modified: None,
            revision: None,
            autosave: None,
            confirmed_changes_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Returns true if the server knows this post.
    pub fn has_remote(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Returns true if the record has a revision.
    pub fn has_revision(&self) -> bool {
        self.revision.is_some()
    }

    /// Returns the content the user currently sees.
    pub fn latest_fields(&self) -> &PostFields {
        self.revision
            .as_ref()
            .map_or(&self.fields, |revision| &revision.fields)
    }

    /// Returns the revision for editing, creating it on first use.
    pub fn edit(&mut self) -> &mut PostFields {
        let fields = &self.fields;
        &mut self
            .revision
            .get_or_insert_with(|| Revision {
                fields: fields.clone(),
                created_at: Timestamp::now(),
                saved_at: None,
            })
            .fields
    }

    /// Marks the revision as saved by the user.
    ///
    /// Records that exist on the server move to `PendingPush`.
    pub fn save_revision(&mut self, now: Timestamp) -> CoreResult<()> {
        let revision = self
            .revision
            .as_mut()
            .ok_or_else(|| CoreError::invalid_operation("no revision to save"))?;
        revision.saved_at = Some(now);
        self.confirmed_changes_at = Some(now);
        if self.has_remote() && self.sync_status.is_synced() {
            self.sync_status = SyncStatus::PendingPush;
        }
        Ok(())
    }

    /// Drops an unsaved revision, returning it.
    ///
    /// Saved revisions carry confirmed user changes and can only leave the
    /// record through [`PostRecord::confirm_push`].
    pub fn discard_revision(&mut self) -> CoreResult<Option<Revision>> {
        if self.revision.as_ref().is_some_and(Revision::is_saved) {
            return Err(CoreError::invalid_operation(
                "saved revision cannot be discarded before it is pushed",
            ));
        }
        Ok(self.revision.take())
    }

    /// Queues the record for upload.
    pub fn mark_pending_push(&mut self) {
        self.sync_status = SyncStatus::PendingPush;
    }

    /// Marks an upload as in flight.
    pub fn mark_pushing(&mut self) {
        self.sync_status = SyncStatus::Pushing;
    }

    /// Records a failed upload.
    pub fn mark_push_failed(&mut self, error: impl Into<String>, at: Timestamp) {
        self.sync_status = SyncStatus::PushFailed {
            error: error.into(),
            failed_at: at,
        };
    }

    /// Records a successful upload.
    ///
    /// Folds the revision into the canonical fields, discards it, adopts
    /// the server identity and moves the record to `Synced`.
    pub fn confirm_push(
        &mut self,
        remote_id: RemotePostId,
        remote_modified: Timestamp,
    ) -> CoreResult<()> {
        if let Some(existing) = self.remote_id {
            if existing != remote_id {
                return Err(CoreError::invalid_operation(format!(
                    "record {} already owns {existing}, cannot adopt {remote_id}",
                    self.local_key
                )));
            }
        }
        if let Some(revision) = self.revision.take() {
            self.fields = revision.fields;
        }
        self.remote_id = Some(remote_id);
        self.remote_modified = Some(remote_modified);
        self.sync_status = SyncStatus::Synced;
        Ok(())
    }

    /// Returns true if the record holds content the server does not have.
    pub fn has_unpushed_changes(&self) -> bool {
        self.has_revision() || !self.sync_status.is_synced()
    }
}
