//! Reconciliation plans.

use crate::conflict::Conflict;
use postsync_core::{LocalKey, PostRecord, RemotePostId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a remote post found its local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Same remote ID.
    RemoteId,
    /// The remote correlation token equals the draft's foreign ID.
    ForeignId,
}

/// What an update does to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Remote content replaced the fields; no local edits were pending.
    Replaced,
    /// Remote content replaced the fields and discarded pending local edits.
    Overwritten,
    /// Only server-owned fields were taken; see the matching conflict.
    ServerOwnedOnly,
}

/// A replacement of one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    /// Key of the stored record.
    pub target: LocalKey,
    /// The record as it should be stored.
    pub record: PostRecord,
    /// How the record was matched.
    pub matched_by: MatchKind,
    /// What happened to the local content.
    pub outcome: UpdateOutcome,
}

/// A scheduled purge of one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDelete {
    /// Key of the stored record.
    pub target: LocalKey,
    /// Remote ID the record carried.
    pub remote_id: Option<RemotePostId>,
}

/// Output of a reconciliation pass.
///
/// Operations target distinct local keys and carry no order relative to
/// each other. Conflicts are outcomes to surface, not writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// New records.
    pub inserts: Vec<PostRecord>,
    /// Replaced records.
    pub updates: Vec<PlanUpdate>,
    /// Purged records.
    pub deletes: Vec<PlanDelete>,
    /// Remote updates that met pending local edits.
    pub conflicts: Vec<Conflict>,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the plan writes nothing and reports nothing.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
            && self.conflicts.is_empty()
    }

    /// Returns true if the plan has writes to apply.
    pub fn has_writes(&self) -> bool {
        !(self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty())
    }

    /// Returns the operation counts.
    pub fn counts(&self) -> PlanCounts {
        PlanCounts {
            inserts: self.inserts.len(),
            updates: self.updates.len(),
            deletes: self.deletes.len(),
            conflicts: self.conflicts.len(),
        }
    }

    /// Finds the update targeting a record.
    pub fn update_for(&self, target: LocalKey) -> Option<&PlanUpdate> {
        self.updates.iter().find(|update| update.target == target)
    }

    /// Returns true if the plan deletes a record.
    pub fn deletes_key(&self, target: LocalKey) -> bool {
        self.deletes.iter().any(|delete| delete.target == target)
    }
}

/// Operation counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    /// Inserted records.
    pub inserts: usize,
    /// Updated records.
    pub updates: usize,
    /// Deleted records.
    pub deletes: usize,
    /// Conflicts.
    pub conflicts: usize,
}

impl std::ops::AddAssign for PlanCounts {
    fn add_assign(&mut self, other: Self) {
        self.inserts += other.inserts;
        self.updates += other.updates;
        self.deletes += other.deletes;
        self.conflicts += other.conflicts;
    }
}

impl fmt::Display for PlanCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} deleted, {} conflicts",
            self.inserts, self.updates, self.deletes, self.conflicts
        )
    }
}
