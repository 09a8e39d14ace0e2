//! Store-backed plan applier.
//!
//! Turns a reconciliation plan into one store transaction. The plan's
//! operations touch distinct local keys, so their order inside the
//! transaction does not matter; the store validates uniqueness against
//! the staged result as a whole.

use postsync_core::{CoreResult, PostStore, Transaction};
use postsync_reconcile::{Plan, PlanCounts};
use std::sync::Arc;
use tracing::debug;

/// Builds the transaction that applies `plan`.
pub fn plan_transaction(plan: &Plan) -> Transaction {
    let mut tx = Transaction::new();
    for record in &plan.inserts {
        tx.insert(record.clone());
    }
    for update in &plan.updates {
        tx.update(update.record.clone());
    }
    for delete in &plan.deletes {
        tx.delete(delete.target);
    }
    tx
}

/// Applies plans to a shared store.
pub struct PlanApplier<S: PostStore + ?Sized> {
    store: Arc<S>,
}

impl<S: PostStore + ?Sized> Clone for PlanApplier<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PostStore + ?Sized> PlanApplier<S> {
    /// Creates an applier for `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Gets the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Commits every write of `plan` atomically.
    ///
    /// Conflicts are not writes; they are counted but not persisted.
    pub fn apply(&self, plan: &Plan) -> CoreResult<PlanCounts> {
        let counts = plan.counts();
        if !plan.has_writes() {
            return Ok(counts);
        }

        let tx = plan_transaction(plan);
        debug!(writes = tx.len(), %counts, "committing plan");
        self.store.commit(tx)?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_core::{CoreError, MemoryPostStore, PendingWrite};
    use postsync_reconcile::{reconcile, ReconcilePolicy};
    use postsync_testkit::prelude::*;

    #[test]
    fn transaction_mirrors_plan() {
        let stale = RecordBuilder::synced(blog(1), 1, 10).build();
        let kept = RecordBuilder::synced(blog(1), 2, 10).title("Old").build();
        let remote = vec![
            RemoteBuilder::new(blog(1), 2, 20).title("New").build(),
            RemoteBuilder::new(blog(1), 3, 20).build(),
        ];

        let policy = ReconcilePolicy::new().with_purge_existing(true);
        let plan = reconcile(&[stale.clone(), kept.clone()], &remote, &policy).unwrap();
        let tx = plan_transaction(&plan);

        assert_eq!(tx.len(), 3);
        assert!(tx
            .writes()
            .iter()
            .any(|w| matches!(w, PendingWrite::Delete(key) if *key == stale.local_key)));
        assert!(tx
            .writes()
            .iter()
            .any(|w| matches!(w, PendingWrite::Update(r) if r.local_key == kept.local_key)));
    }

    #[test]
    fn apply_commits_once() {
        let store = Arc::new(MemoryPostStore::new());
        let applier = PlanApplier::new(Arc::clone(&store));
        let remote = vec![RemoteBuilder::new(blog(1), 7, 20).build()];

        let plan = reconcile(&[], &remote, &ReconcilePolicy::new()).unwrap();
        let counts = applier.apply(&plan).unwrap();
        assert_eq!(counts.inserts, 1);
        assert_eq!(store.len(), 1);

        let again = reconcile(&store.all_records().unwrap(), &remote, &ReconcilePolicy::new())
            .unwrap();
        assert_eq!(applier.apply(&again).unwrap(), PlanCounts::default());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_rejection_is_returned() {
        let existing = RecordBuilder::synced(blog(1), 7, 10).build();
        let store = Arc::new(MemoryPostStore::with_records([existing]).unwrap());
        let applier = PlanApplier::new(Arc::clone(&store));

        // Reconciled against an empty snapshot, so it tries to insert a
        // second owner of remote ID 7.
        let plan = reconcile(
            &[],
            &[RemoteBuilder::new(blog(1), 7, 20).build()],
            &ReconcilePolicy::new(),
        )
        .unwrap();

        let err = applier.apply(&plan).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRemoteId { .. }));
        assert_eq!(store.len(), 1);
    }
}
