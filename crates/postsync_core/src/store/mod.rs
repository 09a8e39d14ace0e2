//! Local post store collaborator.
//!
//! The store is consumed as a transactional object store with secondary
//! indices on remote ID and foreign ID. Two implementations ship here:
//!
//! - [`MemoryPostStore`]: in-process reference store
//! - [`FilePostStore`]: the same store persisted to a directory
//!
//! ```text
//! <store_path>/
//! ├─ LOCK          # Advisory lock for single-writer
//! └─ posts.cbor    # Full record set, replaced atomically on commit
//! ```

mod file;
mod memory;
mod state;

pub use file::FilePostStore;
pub use memory::MemoryPostStore;
pub use state::StoreState;

use crate::error::CoreResult;
use crate::post::{ForeignId, LocalKey, PostRecord, StatusFilter};
use crate::types::{BlogId, PostType, RemotePostId};

/// A pending write in a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Insert a record whose key is not yet stored.
    Insert(PostRecord),
    /// Replace a stored record with the same key.
    Update(PostRecord),
    /// Delete a stored record.
    Delete(LocalKey),
}

impl PendingWrite {
    /// Returns the key the write targets.
    pub fn key(&self) -> LocalKey {
        match self {
            PendingWrite::Insert(record) | PendingWrite::Update(record) => record.local_key,
            PendingWrite::Delete(key) => *key,
        }
    }
}

/// A batch of writes committed atomically.
///
/// Writes apply in the order they were recorded. Either every write
/// becomes visible or none does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    writes: Vec<PendingWrite>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert.
    pub fn insert(&mut self, record: PostRecord) {
        self.writes.push(PendingWrite::Insert(record));
    }

    /// Records an update.
    pub fn update(&mut self, record: PostRecord) {
        self.writes.push(PendingWrite::Update(record));
    }

    /// Records a delete.
    pub fn delete(&mut self, key: LocalKey) {
        self.writes.push(PendingWrite::Delete(key));
    }

    /// Returns the recorded writes in order.
    pub fn writes(&self) -> &[PendingWrite] {
        &self.writes
    }

    /// Returns the number of recorded writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Local post store.
///
/// # Invariants
///
/// - `(blog, remote_id)` is unique across all records
/// - `(blog, foreign_id)` is unique across records without a remote ID
/// - [`PostStore::commit`] applies all writes of a transaction or none
pub trait PostStore: Send + Sync {
    /// Returns the record with the given key.
    fn get(&self, key: LocalKey) -> CoreResult<Option<PostRecord>>;

    /// Finds the record owning a remote ID in a blog.
    fn find_by_remote_id(
        &self,
        blog: BlogId,
        remote_id: RemotePostId,
    ) -> CoreResult<Option<PostRecord>>;

    /// Finds the remote-less record carrying a foreign ID in a blog.
    fn find_by_foreign_id(
        &self,
        blog: BlogId,
        foreign_id: ForeignId,
    ) -> CoreResult<Option<PostRecord>>;

    /// Returns the records of a blog and type that have no remote ID.
    fn all_local(&self, blog: BlogId, post_type: PostType) -> CoreResult<Vec<PostRecord>>;

    /// Returns the records of a blog and type whose canonical status
    /// passes `filter`.
    fn existing_records(
        &self,
        blog: BlogId,
        post_type: PostType,
        filter: &StatusFilter,
    ) -> CoreResult<Vec<PostRecord>>;

    /// Returns every stored record.
    fn all_records(&self) -> CoreResult<Vec<PostRecord>>;

    /// Applies a transaction atomically.
    fn commit(&self, transaction: Transaction) -> CoreResult<()>;

    /// Builds a transaction in `block` and commits it.
    ///
    /// Nothing is written if `block` returns an error.
    fn run_transaction<F, T>(&self, block: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>,
        Self: Sized,
    {
        let mut transaction = Transaction::new();
        let value = block(&mut transaction)?;
        self.commit(transaction)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostFields;

    #[test]
    fn transaction_keeps_order() {
        let record = PostRecord::new_draft(BlogId::new(1), PostType::Post, PostFields::default());
        let key = record.local_key;

        let mut tx = Transaction::new();
        assert!(tx.is_empty());
        tx.insert(record.clone());
        tx.update(record);
        tx.delete(key);

        assert_eq!(tx.len(), 3);
        assert!(matches!(tx.writes()[0], PendingWrite::Insert(_)));
        assert!(matches!(tx.writes()[2], PendingWrite::Delete(_)));
        assert!(tx.writes().iter().all(|w| w.key() == key));
    }
}
