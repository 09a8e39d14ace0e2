//! In-memory post store.

use crate::error::CoreResult;
use crate::post::{ForeignId, LocalKey, PostRecord, StatusFilter};
use crate::store::{PostStore, StoreState, Transaction};
use crate::types::{BlogId, PostType, RemotePostId};
use parking_lot::RwLock;

/// Reference store keeping every record in process memory.
///
/// Readers never observe a partially applied transaction: commits build
/// the next state off to the side and swap it in under the write lock.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    state: RwLock<StoreState>,
}

impl MemoryPostStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = PostRecord>) -> CoreResult<Self> {
        Ok(Self {
            state: RwLock::new(StoreState::from_records(records)?),
        })
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }
}

impl PostStore for MemoryPostStore {
    fn get(&self, key: LocalKey) -> CoreResult<Option<PostRecord>> {
        Ok(self.state.read().get(key).cloned())
    }

    fn find_by_remote_id(
        &self,
        blog: BlogId,
        remote_id: RemotePostId,
    ) -> CoreResult<Option<PostRecord>> {
        Ok(self.state.read().by_remote_id(blog, remote_id).cloned())
    }

    fn find_by_foreign_id(
        &self,
        blog: BlogId,
        foreign_id: ForeignId,
    ) -> CoreResult<Option<PostRecord>> {
        Ok(self.state.read().by_foreign_id(blog, foreign_id).cloned())
    }

    fn all_local(&self, blog: BlogId, post_type: PostType) -> CoreResult<Vec<PostRecord>> {
        Ok(self
            .state
            .read()
            .select(blog, post_type, |record| !record.has_remote()))
    }

    fn existing_records(
        &self,
        blog: BlogId,
        post_type: PostType,
        filter: &StatusFilter,
    ) -> CoreResult<Vec<PostRecord>> {
        Ok(self.state.read().existing(blog, post_type, filter))
    }

    fn all_records(&self) -> CoreResult<Vec<PostRecord>> {
        Ok(self.state.read().records().cloned().collect())
    }

    fn commit(&self, transaction: Transaction) -> CoreResult<()> {
        self.state.write().apply(&transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::post::PostFields;
    use crate::types::Timestamp;

    fn blog() -> BlogId {
        BlogId::new(1)
    }

    #[test]
    fn run_transaction_commits() {
        let store = MemoryPostStore::new();
        let draft = PostRecord::new_draft(blog(), PostType::Post, PostFields::new("a", ""));
        let key = draft.local_key;

        let returned = store
            .run_transaction(|tx| {
                tx.insert(draft.clone());
                Ok(key)
            })
            .unwrap();

        assert_eq!(returned, key);
        assert_eq!(store.get(key).unwrap(), Some(draft.clone()));
        assert_eq!(store.all_local(blog(), PostType::Post).unwrap(), vec![draft]);
    }

    #[test]
    fn run_transaction_aborts_on_block_error() {
        let store = MemoryPostStore::new();
        let result: CoreResult<()> = store.run_transaction(|tx| {
            tx.insert(PostRecord::new_draft(
                blog(),
                PostType::Post,
                PostFields::default(),
            ));
            Err(CoreError::transaction_aborted("user cancelled"))
        });

        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn lookups_by_secondary_index() {
        let draft = PostRecord::new_draft(blog(), PostType::Post, PostFields::default());
        let foreign = draft.foreign_id.unwrap();
        let mut synced = PostRecord::new_draft(blog(), PostType::Post, PostFields::default());
        synced
            .confirm_push(RemotePostId::new(3), Timestamp::from_millis(1))
            .unwrap();

        let store = MemoryPostStore::with_records([draft.clone(), synced.clone()]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.find_by_foreign_id(blog(), foreign).unwrap(),
            Some(draft)
        );
        assert_eq!(
            store
                .find_by_remote_id(blog(), RemotePostId::new(3))
                .unwrap(),
            Some(synced)
        );
        assert_eq!(store.all_local(blog(), PostType::Post).unwrap().len(), 1);
        assert_eq!(store.all_records().unwrap().len(), 2);
    }
}
