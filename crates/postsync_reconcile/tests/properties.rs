//! Reconciliation properties.

use postsync_core::{
    MemoryPostStore, PostRecord, PostStore, RemotePost, SyncStatus, Transaction,
};
use postsync_reconcile::{
    reconcile, ConflictReason, MatchKind, Plan, ReconcilePolicy, UpdateOutcome,
};
use postsync_testkit::prelude::*;
use proptest::prelude::*;

fn policy(overwrite: bool, purge: bool) -> ReconcilePolicy {
    ReconcilePolicy::new()
        .with_overwrite(overwrite)
        .with_purge_existing(purge)
}

/// Applies a plan through the reference store, which enforces the unique
/// indices.
fn apply(local: &[PostRecord], plan: &Plan) -> Vec<PostRecord> {
    let store = MemoryPostStore::with_records(local.iter().cloned()).unwrap();
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
    store.commit(tx).unwrap();
    store.all_records().unwrap()
}

fn twin<'a>(remote: &'a [RemotePost], record: &PostRecord) -> Option<&'a RemotePost> {
    remote.iter().find(|post| {
        Some(post.remote_id) == record.remote_id
            || (record.remote_id.is_none()
                && post.correlation.is_some()
                && post.correlation == record.foreign_id)
    })
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn reconciling_twice_yields_empty_plan(
        scenario in scenario_strategy(12),
        overwrite in any::<bool>(),
        purge in any::<bool>(),
    ) {
        let policy = policy(overwrite, purge);
        let first = reconcile(&scenario.local, &scenario.remote, &policy).unwrap();
        let after = apply(&scenario.local, &first);

        let second = reconcile(&after, &scenario.remote, &policy).unwrap();
        prop_assert!(second.is_empty(), "second pass not empty: {:?}", second.counts());
    }

    #[test]
    fn purge_never_deletes_unsynced_content(
        scenario in scenario_strategy(12),
        overwrite in any::<bool>(),
    ) {
        let plan = reconcile(&scenario.local, &scenario.remote, &policy(overwrite, true)).unwrap();
        for record in scenario.protected_records() {
            prop_assert!(
                !plan.deletes_key(record.local_key),
                "deleted protected record with status {}",
                record.sync_status
            );
        }
        for record in &scenario.local {
            if matches!(
                record.sync_status,
                SyncStatus::Local | SyncStatus::PendingPush | SyncStatus::Pushing | SyncStatus::PushFailed { .. }
            ) {
                prop_assert!(!plan.deletes_key(record.local_key));
            }
        }
    }

    #[test]
    fn purge_without_flag_deletes_nothing(scenario in scenario_strategy(12)) {
        let plan = reconcile(&scenario.local, &scenario.remote, &policy(false, false)).unwrap();
        prop_assert!(plan.deletes.is_empty());
    }

    #[test]
    fn every_remote_post_is_matched_or_inserted(
        scenario in scenario_strategy(12),
        overwrite in any::<bool>(),
    ) {
        let plan = reconcile(&scenario.local, &scenario.remote, &policy(overwrite, false)).unwrap();
        let after = apply(&scenario.local, &plan);
        for post in &scenario.remote {
            let owners = after
                .iter()
                .filter(|r| r.remote_id == Some(post.remote_id))
                .count();
            prop_assert_eq!(owners, 1);
        }
        prop_assert_eq!(after.len(), scenario.local.len() + plan.inserts.len());
    }

    #[test]
    fn drafts_with_twins_are_adopted_not_duplicated(
        scenario in scenario_strategy(12),
        overwrite in any::<bool>(),
    ) {
        let plan = reconcile(&scenario.local, &scenario.remote, &policy(overwrite, false)).unwrap();
        for draft in scenario.local.iter().filter(|r| !r.has_remote()) {
            let Some(post) = twin(&scenario.remote, draft) else {
                prop_assert!(plan.update_for(draft.local_key).is_none());
                continue;
            };
            let update = plan.update_for(draft.local_key).unwrap();
            prop_assert_eq!(update.matched_by, MatchKind::ForeignId);
            prop_assert_eq!(update.record.remote_id, Some(post.remote_id));
            prop_assert!(plan.inserts.iter().all(|r| r.remote_id != Some(post.remote_id)));
        }
    }

    #[test]
    fn pending_edits_survive_without_overwrite(scenario in scenario_strategy(12)) {
        let policy = policy(false, false);
        let plan = reconcile(&scenario.local, &scenario.remote, &policy).unwrap();

        for record in &scenario.local {
            let Some(post) = twin(&scenario.remote, record) else {
                continue;
            };
            let Some(reason) = ConflictReason::detect(record, post.modified) else {
                continue;
            };

            let reported = plan.conflicts.iter().find(|c| c.target == record.local_key);
            if record.remote_modified == Some(post.modified) {
                prop_assert!(reported.is_none());
            } else {
                prop_assert_eq!(reported.map(|c| c.reason), Some(reason));
            }

            let Some(update) = plan.update_for(record.local_key) else {
                continue;
            };
            prop_assert_eq!(update.outcome, UpdateOutcome::ServerOwnedOnly);
            prop_assert_eq!(&update.record.revision, &record.revision);
            for field in policy.partition.user_entered() {
                prop_assert!(update.record.fields.field_eq(&record.fields, field));
            }
            // Synced means the kept content is what the server holds.
            if update.record.sync_status.is_synced() {
                prop_assert_eq!(&update.record.fields, &post.fields());
            }
        }
    }
}

#[test]
fn draft_published_elsewhere_is_adopted() {
    let draft = RecordBuilder::draft(blog(1)).title("Draft").build();
    let published = RemoteBuilder::new(blog(1), 42, 100)
        .title("Draft (published)")
        .correlation(draft.foreign_id)
        .build();

    let plan = reconcile(&[draft.clone()], &[published], &policy(true, false)).unwrap();

    assert!(plan.inserts.is_empty());
    assert!(plan.deletes.is_empty());
    assert_eq!(plan.updates.len(), 1);
    let update = &plan.updates[0];
    assert_eq!(update.target, draft.local_key);
    assert_eq!(update.record.remote_id, Some(remote_id(42)));
    assert_eq!(update.record.fields.title, "Draft (published)");
    assert_eq!(update.record.sync_status, SyncStatus::Synced);
}

#[test]
fn draft_without_correlation_is_left_alone() {
    let draft = RecordBuilder::draft(blog(1)).title("Draft").build();
    let published = RemoteBuilder::new(blog(1), 42, 100).title("Draft").build();

    let plan = reconcile(&[draft], &[published], &policy(false, false)).unwrap();
    assert_eq!(plan.inserts.len(), 1);
    assert!(plan.updates.is_empty());
}

#[test]
fn failed_push_survives_final_page_purge() {
    let failed = RecordBuilder::synced(blog(1), 7, 100)
        .push_failed("HTTP 503")
        .build();
    let other = RemoteBuilder::new(blog(1), 8, 100).build();

    let plan = reconcile(&[failed.clone()], &[other], &policy(false, true)).unwrap();
    assert!(!plan.deletes_key(failed.local_key));
    assert_eq!(plan.inserts.len(), 1);
}

#[test]
fn newer_local_edit_is_preserved_as_conflict() {
    let edited = RecordBuilder::synced(blog(1), 7, 100)
        .title("My title")
        .confirmed_at(300)
        .sync_status(SyncStatus::PendingPush)
        .build();
    let remote = RemoteBuilder::new(blog(1), 7, 200)
        .title("Server title")
        .permalink("https://example.com/server-title")
        .build();

    let plan = reconcile(&[edited.clone()], &[remote], &policy(false, false)).unwrap();

    assert_eq!(plan.conflicts.len(), 1);
    let conflict = &plan.conflicts[0];
    assert_eq!(conflict.target, edited.local_key);
    assert_eq!(conflict.local_fields.title, "My title");
    assert_eq!(conflict.remote_fields.title, "Server title");

    let update = plan.update_for(edited.local_key).unwrap();
    assert_eq!(update.record.fields.title, "My title");
    assert_eq!(
        update.record.fields.permalink.as_deref(),
        Some("https://example.com/server-title")
    );
    assert_eq!(update.record.sync_status, SyncStatus::PendingPush);
}
