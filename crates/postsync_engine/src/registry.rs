//! Run keys, per-key serialization and cancellation.

use crate::state::SyncPhase;
use parking_lot::{Mutex, RwLock};
use postsync_core::{BlogId, PostType, StatusFilter};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Identifies the listing a run synchronizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey {
    /// Blog.
    pub blog: BlogId,
    /// Post type.
    pub post_type: PostType,
    /// Publication statuses listed.
    pub status_filter: StatusFilter,
}

impl SyncKey {
    /// Creates a key.
    pub fn new(blog: BlogId, post_type: PostType, status_filter: StatusFilter) -> Self {
        Self {
            blog,
            post_type,
            status_filter,
        }
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}[{}]",
            self.blog,
            self.post_type.as_str(),
            self.status_filter
        )
    }
}

/// Cooperative cancellation for a run.
///
/// Checked before each page is fetched. A page whose apply step has begun
/// always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run locks and observable phases, per key.
///
/// Runs that write the same records are serialized: the lock is taken per
/// (blog, post type), so listings of one blog and type with different
/// status filters also wait for each other.
#[derive(Debug, Default)]
pub(crate) struct RunRegistry {
    locks: Mutex<HashMap<(BlogId, PostType), Arc<tokio::sync::Mutex<()>>>>,
    phases: Arc<RwLock<HashMap<SyncKey, SyncPhase>>>,
}

/// A run's hold on its key.
///
/// Dropping the slot releases the run lock. A run that is dropped while
/// still working on a page is recorded as cancelled first, so the phase
/// never stays active once nothing is running.
pub(crate) struct RunSlot {
    key: SyncKey,
    phases: Arc<RwLock<HashMap<SyncKey, SyncPhase>>>,
    _lock: OwnedMutexGuard<()>,
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        let mut phases = self.phases.write();
        if let Some(phase) = phases.get_mut(&self.key) {
            if phase.is_active() {
                *phase = SyncPhase::Cancelled;
            }
        }
    }
}

impl RunRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the run lock for a key, creating it on first use.
    pub(crate) fn lock_for(&self, key: &SyncKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry((key.blog, key.post_type)).or_default())
    }

    /// Waits for the run lock of a key.
    pub(crate) async fn acquire(&self, key: &SyncKey) -> RunSlot {
        let lock = self.lock_for(key).lock_owned().await;
        RunSlot {
            key: key.clone(),
            phases: Arc::clone(&self.phases),
            _lock: lock,
        }
    }

    pub(crate) fn phase(&self, key: &SyncKey) -> SyncPhase {
        self.phases.read().get(key).copied().unwrap_or(SyncPhase::Idle)
    }

    pub(crate) fn set_phase(&self, key: &SyncKey, phase: SyncPhase) {
        self.phases.write().insert(key.clone(), phase);
    }
}
