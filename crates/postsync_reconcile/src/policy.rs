//! Reconciliation policy.

use postsync_core::{AuthorId, PostField, PostFields, PostRecord, RemotePostId, StatusFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Split between server-owned and user-entered fields.
///
/// When a record with pending local edits meets a newer remote version
/// and overwriting is off, only server-owned fields are taken from the
/// remote side. Everything else is user-entered and left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPartition {
    server_owned: BTreeSet<PostField>,
}

impl FieldPartition {
    /// Creates a partition with the given server-owned fields.
    pub fn new(server_owned: impl IntoIterator<Item = PostField>) -> Self {
        Self {
            server_owned: server_owned.into_iter().collect(),
        }
    }

    /// Adds a server-owned field.
    pub fn with_server_owned(mut self, field: PostField) -> Self {
        self.server_owned.insert(field);
        self
    }

    /// Marks a field as user-entered.
    pub fn with_user_entered(mut self, field: PostField) -> Self {
        self.server_owned.remove(&field);
        self
    }

    /// Returns true if the field is server-owned.
    pub fn is_server_owned(&self, field: PostField) -> bool {
        self.server_owned.contains(&field)
    }

    /// Iterates over the server-owned fields.
    pub fn server_owned(&self) -> impl Iterator<Item = PostField> + '_ {
        self.server_owned.iter().copied()
    }

    /// Iterates over the user-entered fields.
    pub fn user_entered(&self) -> impl Iterator<Item = PostField> + '_ {
        PostField::ALL
            .into_iter()
            .filter(|field| !self.server_owned.contains(field))
    }

    /// Copies every server-owned field from `remote` into `target`.
    pub fn fold_server_owned(&self, target: &mut PostFields, remote: &PostFields) {
        for field in self.server_owned() {
            target.copy_field(remote, field);
        }
    }
}

impl Default for FieldPartition {
    fn default() -> Self {
        Self::new([PostField::Permalink, PostField::Status, PostField::Autosave])
    }
}

/// Policy for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Remote content replaces records even when they hold local edits.
    pub overwrite: bool,
    /// Local records absent from the batch are scheduled for deletion.
    pub purge_existing: bool,
    /// Server-owned vs user-entered field split.
    #[serde(default)]
    pub partition: FieldPartition,
}

impl ReconcilePolicy {
    /// Creates the default policy: no overwrite, no purge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overwrite flag.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the purge flag.
    pub fn with_purge_existing(mut self, purge: bool) -> Self {
        self.purge_existing = purge;
        self
    }

    /// Sets the field partition.
    pub fn with_partition(mut self, partition: FieldPartition) -> Self {
        self.partition = partition;
        self
    }
}

/// Narrows which local records a purge may consider.
///
/// Matching always runs against the whole local snapshot; the scope only
/// restricts deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeScope {
    /// Only records whose canonical status passes the filter are purged.
    pub filter: StatusFilter,
    /// Only records by this author are purged, when set.
    pub author: Option<AuthorId>,
    /// Remote IDs seen on earlier pages of the same listing.
    pub previously_seen: BTreeSet<RemotePostId>,
}

impl PurgeScope {
    /// Creates a scope for the given status filter.
    pub fn new(filter: StatusFilter) -> Self {
        Self {
            filter,
            author: None,
            previously_seen: BTreeSet::new(),
        }
    }

    /// Restricts the purge to one author's records.
    pub fn with_author(mut self, author: Option<AuthorId>) -> Self {
        self.author = author;
        self
    }

    /// Sets the remote IDs seen on earlier pages.
    pub fn with_previously_seen(mut self, seen: impl IntoIterator<Item = RemotePostId>) -> Self {
        self.previously_seen = seen.into_iter().collect();
        self
    }

    /// Returns true if the record falls inside the listing this scope
    /// describes.
    pub fn covers(&self, record: &PostRecord) -> bool {
        self.filter.matches(&record.fields.status)
            && self
                .author
                .map_or(true, |author| record.fields.author.id == Some(author))
    }
}
