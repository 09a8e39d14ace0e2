//! Configuration for the sync orchestrator.

use postsync_reconcile::FieldPartition;

/// Default number of posts requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Configuration shared by every run of an orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Posts requested per page.
    pub page_size: u32,
    /// Hard cap on pages fetched in one run, whatever the listing asks.
    pub max_pages: Option<u32>,
    /// Server-owned vs user-entered field split used when local edits
    /// are pending.
    pub partition: FieldPartition,
}

impl SyncConfig {
    /// Creates a configuration with the default page size and partition.
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            partition: FieldPartition::default(),
        }
    }

    /// Sets the page size. Zero is raised to one.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Caps the number of pages per run.
    ///
    /// A complete listing that hits the cap stops without purging.
    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Sets the field partition.
    pub fn with_partition(mut self, partition: FieldPartition) -> Self {
        self.partition = partition;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_core::PostField;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_page_size(25)
            .with_max_pages(4)
            .with_partition(FieldPartition::default().with_server_owned(PostField::Slug));

        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_pages, Some(4));
        assert!(config.partition.is_server_owned(PostField::Slug));
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.max_pages.is_none());
        assert!(config.partition.is_server_owned(PostField::Permalink));
        assert_eq!(SyncConfig::new().with_page_size(0).page_size, 1);
    }
}
