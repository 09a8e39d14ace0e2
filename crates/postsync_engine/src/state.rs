//! Sync orchestrator state machine.

use crate::applier::PlanApplier;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncFailure, SyncResult};
use crate::registry::{CancelToken, RunRegistry, RunSlot, SyncKey};
use crate::transport::{FetchQuery, PostTransport};
use parking_lot::RwLock;
use postsync_core::{
    AuthorId, BlogId, PostStore, PostType, RemotePost, RemotePostId, StatusFilter,
};
use postsync_reconcile::{Conflict, Plan, PlanCounts, PurgeScope, ReconcilePolicy, Reconciler};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Phase of a sync run.
///
/// `Idle → Fetching(1) → Reconciling(1) → Applying(1) → Fetching(2) → …`
/// until `Done`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No run has started.
    Idle,
    /// Requesting a page from the transport.
    Fetching {
        /// Page number, starting at 1.
        page: u32,
    },
    /// Computing the plan for a page.
    Reconciling {
        /// Page number.
        page: u32,
    },
    /// Committing the plan for a page.
    Applying {
        /// Page number.
        page: u32,
    },
    /// The listing was exhausted or the requested pages were applied.
    Done,
    /// The run stopped on an error.
    Failed,
    /// The run was cancelled between pages.
    Cancelled,
}

impl SyncPhase {
    /// Returns true while a run is working on a page.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::Fetching { .. } | SyncPhase::Reconciling { .. } | SyncPhase::Applying { .. }
        )
    }

    /// Returns true if the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Done | SyncPhase::Failed | SyncPhase::Cancelled)
    }

    /// Returns the page being worked on.
    pub fn page(&self) -> Option<u32> {
        match self {
            SyncPhase::Fetching { page }
            | SyncPhase::Reconciling { page }
            | SyncPhase::Applying { page } => Some(*page),
            _ => None,
        }
    }

    /// Returns true if a run may move from this phase to `next`.
    pub fn can_transition_to(&self, next: SyncPhase) -> bool {
        use SyncPhase::*;

        match (*self, next) {
            (Idle, Fetching { page }) => page == 1,
            (Idle, Done | Cancelled) => true,
            (Fetching { page: p }, Reconciling { page: q }) => p == q,
            (Reconciling { page: p }, Applying { page: q }) => p == q,
            (Applying { page: p }, Fetching { page: q }) => q == p + 1,
            (Applying { .. }, Done | Cancelled) => true,
            (Fetching { .. } | Reconciling { .. } | Applying { .. }, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Idle => f.write_str("idle"),
            SyncPhase::Fetching { page } => write!(f, "fetching(page {page})"),
            SyncPhase::Reconciling { page } => write!(f, "reconciling(page {page})"),
            SyncPhase::Applying { page } => write!(f, "applying(page {page})"),
            SyncPhase::Done => f.write_str("done"),
            SyncPhase::Failed => f.write_str("failed"),
            SyncPhase::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// How much of the server listing a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Fetch until a short page. Purge, if asked for, runs with the last
    /// page.
    Complete {
        /// Delete synced local records the listing no longer contains.
        purge_existing: bool,
    },
    /// Fetch at most this many pages. Never purges.
    FirstPages {
        /// Page limit.
        max_pages: u32,
    },
}

impl Listing {
    fn purges(&self) -> bool {
        matches!(self, Listing::Complete { purge_existing: true })
    }

    fn max_pages(&self) -> Option<u32> {
        match self {
            Listing::Complete { .. } => None,
            Listing::FirstPages { max_pages } => Some(*max_pages),
        }
    }
}

impl Default for Listing {
    fn default() -> Self {
        Listing::Complete {
            purge_existing: false,
        }
    }
}

/// What a caller asks one run to synchronize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Blog.
    pub blog: BlogId,
    /// Post type.
    pub post_type: PostType,
    /// Publication statuses listed.
    pub status_filter: StatusFilter,
    /// Restrict the listing to one author.
    pub author: Option<AuthorId>,
    /// Pages to cover.
    pub listing: Listing,
    /// Let remote content replace pending local edits.
    pub overwrite: bool,
}

impl SyncRequest {
    /// Creates a request for a complete listing without purge.
    pub fn new(blog: BlogId, post_type: PostType) -> Self {
        Self {
            blog,
            post_type,
            status_filter: StatusFilter::Any,
            author: None,
            listing: Listing::default(),
            overwrite: false,
        }
    }

    /// Sets the status filter.
    pub fn with_status_filter(mut self, filter: StatusFilter) -> Self {
        self.status_filter = filter;
        self
    }

    /// Restricts the listing to an author.
    pub fn with_author(mut self, author: AuthorId) -> Self {
        self.author = Some(author);
        self
    }

    /// Sets the listing.
    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    /// Sets whether remote content overwrites local edits.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Returns the key runs of this request are tracked under.
    pub fn key(&self) -> SyncKey {
        SyncKey::new(self.blog, self.post_type, self.status_filter.clone())
    }

    fn query(&self, page: u32, page_size: u32) -> FetchQuery {
        FetchQuery {
            blog: self.blog,
            post_type: self.post_type,
            status_filter: self.status_filter.clone(),
            author: self.author,
            page,
            page_size,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// What was synchronized.
    pub key: SyncKey,
    /// Pages committed.
    pub pages_applied: u32,
    /// Remote posts received.
    pub items_fetched: usize,
    /// Operation counts summed over pages.
    pub counts: PlanCounts,
    /// Conflicts to surface for user resolution.
    pub conflicts: Vec<Conflict>,
    /// Whether a purge ran.
    pub purged: bool,
    /// Duration of the run.
    pub duration: Duration,
}

/// Statistics across runs.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Runs that reached `Done`.
    pub runs_completed: u64,
    /// Runs that reached `Failed`.
    pub runs_failed: u64,
    /// Runs that were cancelled.
    pub runs_cancelled: u64,
    /// Pages committed.
    pub pages_applied: u64,
    /// Remote posts received.
    pub items_fetched: u64,
    /// Records inserted.
    pub inserted: u64,
    /// Records updated.
    pub updated: u64,
    /// Records deleted by purge.
    pub deleted: u64,
    /// Conflicts reported.
    pub conflicts: u64,
    /// When the last run ended.
    pub last_run_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Progress of one run.
struct Run {
    key: SyncKey,
    phase: SyncPhase,
    pages_applied: u32,
    items_fetched: usize,
    counts: PlanCounts,
    conflicts: Vec<Conflict>,
    seen: BTreeSet<RemotePostId>,
    purged: bool,
    slot: Option<RunSlot>,
}

/// Drives paginated sync runs between a transport and a local store.
///
/// Runs touching the same blog and post type are serialized: a second
/// run waits until the first one ends. Runs for other blogs or types
/// proceed concurrently.
pub struct SyncOrchestrator<T: PostTransport, S: PostStore + 'static> {
    config: SyncConfig,
    transport: Arc<T>,
    applier: PlanApplier<S>,
    registry: RunRegistry,
    stats: RwLock<SyncStats>,
}

impl<T: PostTransport, S: PostStore + 'static> SyncOrchestrator<T, S> {
    /// Creates an orchestrator owning its collaborators.
    pub fn new(config: SyncConfig, transport: T, store: S) -> Self {
        Self::from_shared(config, Arc::new(transport), Arc::new(store))
    }

    /// Creates an orchestrator over shared collaborators.
    pub fn from_shared(config: SyncConfig, transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            config,
            transport,
            applier: PlanApplier::new(store),
            registry: RunRegistry::new(),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Gets the store.
    pub fn store(&self) -> &Arc<S> {
        self.applier.store()
    }

    /// Gets the phase of the latest run for a key.
    pub fn phase(&self, key: &SyncKey) -> SyncPhase {
        self.registry.phase(key)
    }

    /// Returns true while a run for the key is working on a page.
    pub fn is_running(&self, key: &SyncKey) -> bool {
        self.phase(key).is_active()
    }

    /// Gets the accumulated stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Runs a sync to completion.
    pub async fn sync(&self, request: &SyncRequest) -> Result<SyncReport, SyncFailure> {
        self.sync_with_cancel(request, &CancelToken::new()).await
    }

    /// Runs a sync that stops before the next page once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncFailure`] carrying the number of pages committed
    /// before the run stopped. Those pages stay committed.
    pub async fn sync_with_cancel(
        &self,
        request: &SyncRequest,
        cancel: &CancelToken,
    ) -> Result<SyncReport, SyncFailure> {
        let key = request.key();
        let slot = self.registry.acquire(&key).await;

        let start = Instant::now();
        let mut run = Run {
            key,
            phase: SyncPhase::Idle,
            pages_applied: 0,
            items_fetched: 0,
            counts: PlanCounts::default(),
            conflicts: Vec::new(),
            seen: BTreeSet::new(),
            purged: false,
            slot: Some(slot),
        };
        self.registry.set_phase(&run.key, SyncPhase::Idle);
        info!(key = %run.key, listing = ?request.listing, "sync started");

        match self.run_pages(request, cancel, &mut run).await {
            Ok(()) => {
                let report = SyncReport {
                    key: run.key.clone(),
                    pages_applied: run.pages_applied,
                    items_fetched: run.items_fetched,
                    counts: run.counts,
                    conflicts: std::mem::take(&mut run.conflicts),
                    purged: run.purged,
                    duration: start.elapsed(),
                };
                self.record_success(&report);
                info!(
                    key = %report.key,
                    pages = report.pages_applied,
                    counts = %report.counts,
                    "sync finished"
                );
                Ok(report)
            }
            Err(error) => Err(self.handle_error(&mut run, error)),
        }
    }

    async fn run_pages(
        &self,
        request: &SyncRequest,
        cancel: &CancelToken,
        run: &mut Run,
    ) -> SyncResult<()> {
        let page_size = self.config.page_size.max(1);
        let page_limit = match (request.listing.max_pages(), self.config.max_pages) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let mut page = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if page_limit.is_some_and(|limit| page > limit) {
                if request.listing.purges() {
                    warn!(key = %run.key, page, "page cap reached before the listing ended, purge skipped");
                }
                break;
            }

            self.transition(run, SyncPhase::Fetching { page })?;
            let batch = self
                .transport
                .fetch_posts(&request.query(page, page_size))
                .await?;
            run.items_fetched += batch.len();
            let is_last = batch.len() < page_size as usize;

            self.transition(run, SyncPhase::Reconciling { page })?;
            let purge = is_last && request.listing.purges();
            let plan = self.reconcile_page(request, &batch, purge, &run.seen)?;
            run.seen.extend(batch.iter().map(|post| post.remote_id));

            self.transition(run, SyncPhase::Applying { page })?;
            let (counts, conflicts) = self.apply_page(run, plan).await?;
            run.pages_applied += 1;
            run.counts += counts;
            run.conflicts.extend(conflicts);
            run.purged |= purge;
            debug!(key = %run.key, page, fetched = batch.len(), %counts, "page applied");

            if is_last {
                break;
            }
            page += 1;
        }

        self.transition(run, SyncPhase::Done)
    }

    fn reconcile_page(
        &self,
        request: &SyncRequest,
        batch: &[RemotePost],
        purge: bool,
        seen: &BTreeSet<RemotePostId>,
    ) -> SyncResult<Plan> {
        // Matching needs every record of the blog and type, whatever the
        // filter: a post may have changed status since the last run.
        let snapshot =
            self.store()
                .existing_records(request.blog, request.post_type, &StatusFilter::Any)?;

        let policy = ReconcilePolicy::new()
            .with_overwrite(request.overwrite)
            .with_purge_existing(purge)
            .with_partition(self.config.partition.clone());
        let mut reconciler = Reconciler::new(policy);
        if purge {
            reconciler = reconciler.with_purge_scope(
                PurgeScope::new(request.status_filter.clone())
                    .with_author(request.author)
                    .with_previously_seen(seen.iter().copied()),
            );
        }

        Ok(reconciler.reconcile(&snapshot, batch)?)
    }

    /// Commits a plan on the blocking pool.
    ///
    /// The run slot travels with the task, so if this future is dropped
    /// mid-commit the key stays locked until the commit has finished, and
    /// the run is then recorded as cancelled.
    async fn apply_page(
        &self,
        run: &mut Run,
        plan: Plan,
    ) -> SyncResult<(PlanCounts, Vec<Conflict>)> {
        let applier = self.applier.clone();
        let slot = run.slot.take();

        let (result, slot) = tokio::task::spawn_blocking(move || {
            let result = applier.apply(&plan);
            (result.map(|counts| (counts, plan.conflicts)), slot)
        })
        .await
        .map_err(|e| SyncError::ApplyTask(e.to_string()))?;

        run.slot = slot;
        Ok(result?)
    }

    fn transition(&self, run: &mut Run, next: SyncPhase) -> SyncResult<()> {
        if !run.phase.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: run.phase.to_string(),
                to: next.to_string(),
            });
        }
        debug!(key = %run.key, from = %run.phase, to = %next, "phase transition");
        run.phase = next;
        self.registry.set_phase(&run.key, next);
        Ok(())
    }

    fn record_success(&self, report: &SyncReport) {
        let mut stats = self.stats.write();
        stats.runs_completed += 1;
        stats.pages_applied += u64::from(report.pages_applied);
        stats.items_fetched += report.items_fetched as u64;
        stats.inserted += report.counts.inserts as u64;
        stats.updated += report.counts.updates as u64;
        stats.deleted += report.counts.deletes as u64;
        stats.conflicts += report.counts.conflicts as u64;
        stats.last_run_time = Some(Instant::now());
        stats.last_error = None;
    }

    /// Moves the run to its terminal phase and records the failure.
    fn handle_error(&self, run: &mut Run, error: SyncError) -> SyncFailure {
        let terminal = if matches!(error, SyncError::Cancelled) {
            SyncPhase::Cancelled
        } else {
            SyncPhase::Failed
        };
        run.phase = terminal;
        self.registry.set_phase(&run.key, terminal);

        {
            let mut stats = self.stats.write();
            match terminal {
                SyncPhase::Cancelled => stats.runs_cancelled += 1,
                _ => stats.runs_failed += 1,
            }
            stats.pages_applied += u64::from(run.pages_applied);
            stats.items_fetched += run.items_fetched as u64;
            stats.inserted += run.counts.inserts as u64;
            stats.updated += run.counts.updates as u64;
            stats.deleted += run.counts.deletes as u64;
            stats.conflicts += run.counts.conflicts as u64;
            stats.last_run_time = Some(Instant::now());
            stats.last_error = Some(error.to_string());
        }

        if terminal == SyncPhase::Cancelled {
            info!(key = %run.key, pages = run.pages_applied, "sync cancelled");
        } else {
            warn!(
                key = %run.key,
                pages = run.pages_applied,
                error = %error,
                invariant = error.is_invariant_violation(),
                "sync failed"
            );
        }

        SyncFailure {
            pages_applied: run.pages_applied,
            error,
        }
    }
}
