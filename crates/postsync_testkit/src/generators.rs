//! Property-based test generators using proptest.
//!
//! Provides strategies for local snapshots and remote batches that keep
//! the store invariants intact (unique remote IDs, unique foreign IDs),
//! so properties exercise reconciliation rather than input validation.

use postsync_core::{
    BlogId, ForeignId, LocalKey, PostFields, PostRecord, PostStatus, PostType, RemotePost,
    RemotePostId, RemoteTerm, SyncStatus, Timestamp,
};
use proptest::prelude::*;
use uuid::Uuid;

/// Blog used by generated scenarios.
pub const SCENARIO_BLOG: BlogId = BlogId::new(1);

/// Strategy for sync statuses, all variants.
pub fn sync_status_strategy() -> impl Strategy<Value = SyncStatus> {
    prop_oneof![
        1 => Just(SyncStatus::Local),
        1 => Just(SyncStatus::PendingPush),
        1 => Just(SyncStatus::Pushing),
        3 => Just(SyncStatus::Synced),
        1 => "[a-z ]{1,12}".prop_map(|error| SyncStatus::PushFailed {
            error,
            failed_at: Timestamp::from_millis(0),
        }),
    ]
}

/// Strategy for server publication statuses.
pub fn post_status_strategy() -> impl Strategy<Value = PostStatus> {
    prop_oneof![
        1 => Just(PostStatus::Draft),
        1 => Just(PostStatus::Pending),
        1 => Just(PostStatus::Private),
        3 => Just(PostStatus::Publish),
        1 => Just(PostStatus::Scheduled),
    ]
}

/// Strategy for short post titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,8}( [a-z]{1,6}){0,2}").expect("Invalid regex")
}

/// Strategy for taxonomy term lists in server form.
pub fn terms_strategy() -> impl Strategy<Value = Vec<RemoteTerm>> {
    prop::collection::vec(
        (
            prop_oneof![Just("category"), Just("post_tag")],
            "[a-z]{1,6}",
        )
            .prop_map(|(taxonomy, name)| RemoteTerm::new(taxonomy, name)),
        0..4,
    )
}

/// Where a logical post of a scenario exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Local draft never seen by the server.
    LocalDraft,
    /// Local draft whose server twin echoes its foreign ID.
    DraftWithTwin,
    /// Local record with a remote ID that the batch does not list.
    LocalOnly,
    /// Remote post with no local counterpart.
    RemoteOnly,
    /// Local record and remote post sharing a remote ID.
    Both,
}

/// One logical post of a generated scenario.
#[derive(Debug, Clone)]
pub struct Slot {
    /// Where the post exists.
    pub kind: SlotKind,
    /// Local sync status.
    pub sync_status: SyncStatus,
    /// Server status of both sides.
    pub post_status: PostStatus,
    /// Whether the local record has an unsaved revision.
    pub has_revision: bool,
    /// Local save time, if edits were saved.
    pub confirmed_at: Option<i64>,
    /// Local title.
    pub local_title: String,
    /// Remote title.
    pub remote_title: String,
    /// Remote modification time last folded into the local record.
    pub local_modified: i64,
    /// Remote modification time of the batch item.
    pub remote_modified: i64,
    /// Remote terms.
    pub terms: Vec<RemoteTerm>,
}

/// Strategy for one slot.
pub fn slot_strategy() -> impl Strategy<Value = Slot> {
    (
        prop_oneof![
            1 => Just(SlotKind::LocalDraft),
            1 => Just(SlotKind::DraftWithTwin),
            1 => Just(SlotKind::LocalOnly),
            1 => Just(SlotKind::RemoteOnly),
            2 => Just(SlotKind::Both),
        ],
        sync_status_strategy(),
        post_status_strategy(),
        any::<bool>(),
        prop::option::of(0i64..2_000),
        title_strategy(),
        title_strategy(),
        0i64..1_000,
        0i64..2_000,
        terms_strategy(),
    )
        .prop_map(
            |(
                kind,
                sync_status,
                post_status,
                has_revision,
                confirmed_at,
                local_title,
                remote_title,
                local_modified,
                remote_modified,
                terms,
            )| Slot {
                kind,
                sync_status,
                post_status,
                has_revision,
                confirmed_at,
                local_title,
                remote_title,
                local_modified,
                remote_modified,
                terms,
            },
        )
}

/// A local snapshot and a remote batch for the same blog and type.
#[derive(Debug, Clone)]
pub struct SyncScenario {
    /// Local records.
    pub local: Vec<PostRecord>,
    /// Remote batch.
    pub remote: Vec<RemotePost>,
    /// The slots the scenario was built from, in order.
    pub slots: Vec<Slot>,
}

impl SyncScenario {
    /// Builds a scenario from slots.
    ///
    /// Slot `i` gets remote ID and local key `i + 1` and foreign ID
    /// `1001 + i`, so identifiers never collide.
    pub fn from_slots(slots: Vec<Slot>) -> Self {
        let mut local = Vec::new();
        let mut remote = Vec::new();

        for (i, slot) in slots.iter().enumerate() {
            let index = i as u64 + 1;
            let key = LocalKey::from_uuid(Uuid::from_u128(u128::from(index)));
            let foreign = ForeignId::from_uuid(Uuid::from_u128(1_000 + u128::from(index)));

            let has_local = !matches!(slot.kind, SlotKind::RemoteOnly);
            let has_remote_id = matches!(slot.kind, SlotKind::LocalOnly | SlotKind::Both);
            let has_remote = matches!(
                slot.kind,
                SlotKind::RemoteOnly | SlotKind::Both | SlotKind::DraftWithTwin
            );

            if has_local {
                local.push(slot_record(slot, key, foreign, has_remote_id.then_some(index)));
            }
            if has_remote {
                let mut post = RemotePost::new(
                    RemotePostId::new(index),
                    SCENARIO_BLOG,
                    PostType::Post,
                    slot.remote_title.clone(),
                    Timestamp::from_millis(slot.remote_modified),
                );
                post.content = "body".into();
                post.status = slot.post_status.as_str().to_string();
                post.terms.clone_from(&slot.terms);
                if slot.kind == SlotKind::DraftWithTwin {
                    post.correlation = Some(foreign);
                }
                remote.push(post);
            }
        }

        Self {
            local,
            remote,
            slots,
        }
    }

    /// Returns the local records a purge must never delete.
    pub fn protected_records(&self) -> impl Iterator<Item = &PostRecord> {
        self.local
            .iter()
            .filter(|r| !r.sync_status.is_synced() || r.has_revision() || !r.has_remote())
    }
}

fn slot_record(
    slot: &Slot,
    key: LocalKey,
    foreign: ForeignId,
    remote_id: Option<u64>,
) -> PostRecord {
    let mut fields = PostFields::new(slot.local_title.clone(), "body");
    fields.status = slot.post_status.clone();

    let mut record = PostRecord::new_draft(SCENARIO_BLOG, PostType::Post, fields);
    record.local_key = key;
    record.foreign_id = Some(foreign);
    record.confirmed_changes_at = slot.confirmed_at.map(Timestamp::from_millis);

    match remote_id {
        Some(id) => {
            record.remote_id = Some(RemotePostId::new(id));
            record.remote_modified = Some(Timestamp::from_millis(slot.local_modified));
            record.sync_status = slot.sync_status.clone();
        }
        // A record the server has never seen cannot be synced.
        None if slot.sync_status.is_synced() => record.sync_status = SyncStatus::Local,
        None => record.sync_status = slot.sync_status.clone(),
    }

    if slot.has_revision {
        record.edit().title = format!("{} (edited)", slot.local_title);
    }
    record
}

/// Strategy for scenarios with up to `max_slots` logical posts.
pub fn scenario_strategy(max_slots: usize) -> impl Strategy<Value = SyncScenario> {
    prop::collection::vec(slot_strategy(), 0..max_slots).prop_map(SyncScenario::from_slots)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
