//! The reconciliation pass.

use crate::conflict::{Conflict, ConflictReason};
use crate::dedup::ForeignIdResolver;
use crate::error::{ReconcileError, ReconcileResult};
use crate::plan::{MatchKind, Plan, PlanDelete, PlanUpdate, UpdateOutcome};
use crate::policy::{PurgeScope, ReconcilePolicy};
use postsync_core::{
    BlogId, LocalKey, PostField, PostFields, PostRecord, RemotePost, RemotePostId, SyncStatus,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Computes plans from a local snapshot and a remote batch.
///
/// Pure: reads its inputs, returns a value, touches nothing.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: ReconcilePolicy,
    purge_scope: Option<PurgeScope>,
}

impl Reconciler {
    /// Creates a reconciler with a policy.
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self {
            policy,
            purge_scope: None,
        }
    }

    /// Restricts purge to a scope.
    ///
    /// Without a scope every local record passed to
    /// [`Reconciler::reconcile`] is a purge candidate.
    pub fn with_purge_scope(mut self, scope: PurgeScope) -> Self {
        self.purge_scope = Some(scope);
        self
    }

    /// Returns the policy.
    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Reconciles a remote batch against local records.
    ///
    /// For each remote post, in order:
    /// 1. match by remote ID
    /// 2. else match a draft by foreign ID, which then adopts the remote ID
    /// 3. else insert a new record
    ///
    /// Then, if the policy asks for it, schedules the purge of local
    /// records the batch did not touch. Records that are not `Synced`, or
    /// that hold a revision, are never purged.
    ///
    /// # Errors
    ///
    /// Fails with an invariant violation if the local records or the batch
    /// are inconsistent; see [`ReconcileError`].
    pub fn reconcile(&self, local: &[PostRecord], remote: &[RemotePost]) -> ReconcileResult<Plan> {
        let by_remote = index_remote_ids(local)?;
        let resolver = ForeignIdResolver::new(local)?;

        let mut plan = Plan::new();
        let mut seen: HashSet<(BlogId, RemotePostId)> = HashSet::with_capacity(remote.len());
        let mut touched: HashSet<LocalKey> = HashSet::new();
        let mut claims: HashMap<LocalKey, RemotePostId> = HashMap::new();

        for item in remote {
            if !seen.insert((item.blog, item.remote_id)) {
                return Err(ReconcileError::DuplicateRemoteInBatch {
                    blog: item.blog,
                    remote_id: item.remote_id,
                });
            }

            let (target, matched_by) =
                if let Some(record) = by_remote.get(&(item.blog, item.remote_id)) {
                    (*record, MatchKind::RemoteId)
                } else if let Some(draft) = resolver.resolve(item) {
                    if let Some(first) = claims.insert(draft.local_key, item.remote_id) {
                        return Err(ReconcileError::DraftClaimedTwice {
                            target: draft.local_key,
                            first,
                            second: item.remote_id,
                        });
                    }
                    debug!(
                        local_key = %draft.local_key,
                        remote_id = %item.remote_id,
                        "draft matched by foreign ID"
                    );
                    (draft, MatchKind::ForeignId)
                } else {
                    plan.inserts.push(item.to_record());
                    continue;
                };

            touched.insert(target.local_key);
            self.merge(target, item, matched_by, &mut plan)?;
        }

        if self.policy.purge_existing {
            self.purge(local, &seen, &touched, &mut plan);
        }

        debug!(
            local = local.len(),
            remote = remote.len(),
            counts = %plan.counts(),
            "reconciled batch"
        );
        Ok(plan)
    }

    fn merge(
        &self,
        record: &PostRecord,
        remote: &RemotePost,
        matched_by: MatchKind,
        plan: &mut Plan,
    ) -> ReconcileResult<()> {
        let remote_fields = remote.fields();
        let mut merged = record.clone();
        merged.remote_id = Some(remote.remote_id);

        let outcome = match ConflictReason::detect(record, remote.modified) {
            None => {
                replace(&mut merged, remote, remote_fields);
                UpdateOutcome::Replaced
            }
            Some(reason) if self.policy.overwrite => {
                debug!(
                    local_key = %record.local_key,
                    remote_id = %remote.remote_id,
                    %reason,
                    "discarding local edits"
                );
                replace(&mut merged, remote, remote_fields);
                merged.confirmed_changes_at = None;
                UpdateOutcome::Overwritten
            }
            Some(reason) => {
                let partition = &self.policy.partition;
                partition.fold_server_owned(&mut merged.fields, &remote_fields);
                if partition.is_server_owned(PostField::Autosave) {
                    merged.autosave = remote.autosave.clone();
                }
                // A remote version already folded in was already reported.
                if record.remote_modified != Some(remote.modified) {
                    let conflict = Conflict::new(record, remote, reason)?;
                    info!(
                        local_key = %record.local_key,
                        remote_id = %remote.remote_id,
                        %reason,
                        "conflict with pending local edits"
                    );
                    plan.conflicts.push(conflict);
                }
                merged.remote_modified = Some(remote.modified);
                // Kept content the server lacks is no longer in sync.
                if merged.sync_status.is_synced() && merged.fields != remote_fields {
                    merged.mark_pending_push();
                }
                UpdateOutcome::ServerOwnedOnly
            }
        };

        if merged != *record {
            plan.updates.push(PlanUpdate {
                target: record.local_key,
                record: merged,
                matched_by,
                outcome,
            });
        }
        Ok(())
    }

    fn purge(
        &self,
        local: &[PostRecord],
        seen: &HashSet<(BlogId, RemotePostId)>,
        touched: &HashSet<LocalKey>,
        plan: &mut Plan,
    ) {
        let unscoped = PurgeScope::default();
        let scope = self.purge_scope.as_ref().unwrap_or(&unscoped);

        for record in local {
            let Some(remote_id) = record.remote_id else {
                continue;
            };
            if touched.contains(&record.local_key)
                || seen.contains(&(record.blog, remote_id))
                || scope.previously_seen.contains(&remote_id)
                || !scope.covers(record)
            {
                continue;
            }
            if !record.sync_status.is_synced() || record.has_revision() {
                debug!(
                    local_key = %record.local_key,
                    %remote_id,
                    status = record.sync_status.label(),
                    "retaining unsynced record"
                );
                continue;
            }
            plan.deletes.push(PlanDelete {
                target: record.local_key,
                remote_id: Some(remote_id),
            });
        }
    }
}

/// Reconciles with a policy and no purge scope.
pub fn reconcile(
    local: &[PostRecord],
    remote: &[RemotePost],
    policy: &ReconcilePolicy,
) -> ReconcileResult<Plan> {
    Reconciler::new(policy.clone()).reconcile(local, remote)
}

fn replace(merged: &mut PostRecord, remote: &RemotePost, fields: PostFields) {
    merged.fields = fields;
    merged.revision = None;
    merged.autosave = remote.autosave.clone();
    merged.remote_modified = Some(remote.modified);
    merged.sync_status = SyncStatus::Synced;
}

fn index_remote_ids(
    local: &[PostRecord],
) -> ReconcileResult<HashMap<(BlogId, RemotePostId), &PostRecord>> {
    let mut index = HashMap::with_capacity(local.len());
    for record in local {
        let Some(remote_id) = record.remote_id else {
            continue;
        };
        if let Some(first) = index.insert((record.blog, remote_id), record) {
            return Err(ReconcileError::DuplicateLocalRemoteId {
                blog: record.blog,
                remote_id,
                first: first.local_key,
                second: record.local_key,
            });
        }
    }
    Ok(index)
}
