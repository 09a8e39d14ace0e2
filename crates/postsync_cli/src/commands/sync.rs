//! Sync command implementation.

use super::read_json;
use postsync_core::{
    AuthorId, BlogId, FilePostStore, PostStatus, PostType, RemotePost, StatusFilter,
};
use postsync_engine::{
    Listing, MemoryTransport, SyncConfig, SyncOrchestrator, SyncReport, SyncRequest,
};
use std::path::Path;

/// Options of one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Blog ID.
    pub blog: u64,
    /// Post type.
    pub post_type: PostType,
    /// Status names to list; empty means any.
    pub statuses: Vec<String>,
    /// Author ID to list.
    pub author: Option<u64>,
    /// Posts per page.
    pub page_size: u32,
    /// Page limit; `None` lists everything.
    pub pages: Option<u32>,
    /// Let remote content replace pending local edits.
    pub overwrite: bool,
    /// Purge synced records missing from the listing.
    pub purge: bool,
}

impl SyncOptions {
    /// Builds the orchestrator request.
    pub fn request(&self) -> SyncRequest {
        let listing = match self.pages {
            Some(max_pages) => Listing::FirstPages { max_pages },
            None => Listing::Complete {
                purge_existing: self.purge,
            },
        };
        let filter = StatusFilter::only(self.statuses.iter().map(|s| PostStatus::parse(s)));

        let mut request = SyncRequest::new(BlogId::new(self.blog), self.post_type)
            .with_status_filter(filter)
            .with_listing(listing)
            .with_overwrite(self.overwrite);
        if let Some(author) = self.author {
            request = request.with_author(AuthorId::new(author));
        }
        request
    }
}

/// Runs the sync command.
pub fn run(
    store: &Path,
    remote: &Path,
    options: &SyncOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.pages.is_some() && options.purge {
        tracing::warn!("--purge ignored: a limited listing never purges");
    }

    let listing: Vec<RemotePost> = read_json(remote)?;
    let report = sync_store(store, listing, options)?;
    print!("{}", render_report(&report));
    Ok(())
}

/// Syncs a file store against a server listing.
pub fn sync_store(
    store: &Path,
    listing: Vec<RemotePost>,
    options: &SyncOptions,
) -> Result<SyncReport, Box<dyn std::error::Error>> {
    let store = FilePostStore::open(store, true)?;
    let orchestrator = SyncOrchestrator::new(
        SyncConfig::new().with_page_size(options.page_size),
        MemoryTransport::with_posts(listing),
        store,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(orchestrator.sync(&options.request()))?;
    Ok(report)
}

/// Renders a report as human-readable text.
pub fn render_report(report: &SyncReport) -> String {
    let mut out = format!(
        "Synced {}: {} page(s), {} fetched, {}{} in {:?}\n",
        report.key,
        report.pages_applied,
        report.items_fetched,
        report.counts,
        if report.purged { ", purged" } else { "" },
        report.duration
    );
    for conflict in &report.conflicts {
        out.push_str(&format!(
            "  conflict  {}  {}  {}\n",
            conflict.target, conflict.remote_id, conflict.reason
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_core::{PostStore, SyncStatus};
    use postsync_testkit::prelude::*;

    fn options() -> SyncOptions {
        SyncOptions {
            blog: 1,
            post_type: PostType::Post,
            statuses: Vec::new(),
            author: None,
            page_size: 2,
            pages: None,
            overwrite: false,
            purge: true,
        }
    }

    #[test]
    fn request_from_options() {
        let mut opts = options();
        opts.statuses = vec!["publish".into(), "future".into()];
        opts.author = Some(4);
        let request = opts.request();

        assert_eq!(
            request.status_filter,
            StatusFilter::only([PostStatus::Publish, PostStatus::Scheduled])
        );
        assert_eq!(request.author, Some(AuthorId::new(4)));
        assert_eq!(request.listing, Listing::Complete { purge_existing: true });

        opts.pages = Some(3);
        assert_eq!(opts.request().listing, Listing::FirstPages { max_pages: 3 });
    }

    #[test]
    fn syncs_into_a_file_store() {
        let dir = TestStore::new().into_dir();
        let listing: Vec<_> = (1..=3)
            .map(|id| RemoteBuilder::new(blog(1), id, 100).build())
            .collect();

        let report = sync_store(dir.path(), listing, &options()).unwrap();
        assert_eq!(report.counts.inserts, 3);
        assert_eq!(report.pages_applied, 2);
        assert!(render_report(&report).contains("3 inserted"));

        let store = TestStore::open(dir);
        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.sync_status == SyncStatus::Synced));
    }
}
