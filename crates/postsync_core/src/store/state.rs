//! Indexed record set shared by the store implementations.

use crate::error::{CoreError, CoreResult};
use crate::post::{ForeignId, LocalKey, PostRecord, StatusFilter};
use crate::store::{PendingWrite, Transaction};
use crate::types::{BlogId, PostType, RemotePostId};
use std::collections::{BTreeMap, HashMap};

/// Record set with its unique secondary indices.
///
/// All mutation goes through [`StoreState::apply`], which validates the
/// whole transaction against a staged copy before anything is replaced.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    records: BTreeMap<LocalKey, PostRecord>,
    by_remote: HashMap<(BlogId, RemotePostId), LocalKey>,
    by_foreign: HashMap<(BlogId, ForeignId), LocalKey>,
}

impl StoreState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a state from a list of records, checking every index.
    pub fn from_records(records: impl IntoIterator<Item = PostRecord>) -> CoreResult<Self> {
        let mut state = Self::new();
        for record in records {
            state.insert(record)?;
        }
        Ok(state)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the state holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a record by key.
    pub fn get(&self, key: LocalKey) -> Option<&PostRecord> {
        self.records.get(&key)
    }

    /// Returns the record owning a remote ID.
    pub fn by_remote_id(&self, blog: BlogId, remote_id: RemotePostId) -> Option<&PostRecord> {
        self.by_remote
            .get(&(blog, remote_id))
            .and_then(|key| self.records.get(key))
    }

    /// Returns the remote-less record carrying a foreign ID.
    pub fn by_foreign_id(&self, blog: BlogId, foreign_id: ForeignId) -> Option<&PostRecord> {
        self.by_foreign
            .get(&(blog, foreign_id))
            .and_then(|key| self.records.get(key))
    }

    /// Iterates over all records in key order.
    pub fn records(&self) -> impl Iterator<Item = &PostRecord> {
        self.records.values()
    }

    /// Returns the records of a blog and type matching a predicate.
    pub fn select(
        &self,
        blog: BlogId,
        post_type: PostType,
        mut predicate: impl FnMut(&PostRecord) -> bool,
    ) -> Vec<PostRecord> {
        self.records
            .values()
            .filter(|r| r.blog == blog && r.post_type == post_type && predicate(r))
            .cloned()
            .collect()
    }

    /// Returns the records of a blog and type whose canonical status passes
    /// the filter.
    pub fn existing(
        &self,
        blog: BlogId,
        post_type: PostType,
        filter: &StatusFilter,
    ) -> Vec<PostRecord> {
        self.select(blog, post_type, |r| filter.matches(&r.fields.status))
    }

    /// Returns a copy of this state with the transaction applied.
    ///
    /// `self` is left untouched, so a failing write discards the whole
    /// transaction.
    pub fn staged(&self, transaction: &Transaction) -> CoreResult<Self> {
        let mut next = self.clone();
        for write in transaction.writes() {
            match write {
                PendingWrite::Insert(record) => next.insert(record.clone())?,
                PendingWrite::Update(record) => next.update(record.clone())?,
                PendingWrite::Delete(key) => next.delete(*key)?,
            }
        }
        Ok(next)
    }

    /// Applies a transaction in place, all or nothing.
    pub fn apply(&mut self, transaction: &Transaction) -> CoreResult<()> {
        if transaction.is_empty() {
            return Ok(());
        }
        *self = self.staged(transaction)?;
        Ok(())
    }

    fn insert(&mut self, record: PostRecord) -> CoreResult<()> {
        if self.records.contains_key(&record.local_key) {
            return Err(CoreError::RecordExists {
                key: record.local_key,
            });
        }
        self.check_unique(&record)?;
        self.index(&record);
        self.records.insert(record.local_key, record);
        Ok(())
    }

    fn update(&mut self, record: PostRecord) -> CoreResult<()> {
        let previous = self
            .records
            .get(&record.local_key)
            .cloned()
            .ok_or(CoreError::RecordNotFound {
                key: record.local_key,
            })?;
        if let (Some(old), new) = (previous.remote_id, record.remote_id) {
            if new != Some(old) {
                return Err(CoreError::invalid_operation(format!(
                    "record {} cannot give up {old}",
                    record.local_key
                )));
            }
        }
        self.unindex(&previous);
        if let Err(err) = self.check_unique(&record) {
            self.index(&previous);
            return Err(err);
        }
        self.index(&record);
        self.records.insert(record.local_key, record);
        Ok(())
    }

    fn delete(&mut self, key: LocalKey) -> CoreResult<()> {
        let record = self
            .records
            .remove(&key)
            .ok_or(CoreError::RecordNotFound { key })?;
        self.unindex(&record);
        Ok(())
    }

    fn check_unique(&self, record: &PostRecord) -> CoreResult<()> {
        match (record.remote_id, record.foreign_id) {
            (Some(remote_id), _) => match self.by_remote.get(&(record.blog, remote_id)) {
                Some(existing) if *existing != record.local_key => {
                    Err(CoreError::DuplicateRemoteId {
                        blog: record.blog,
                        remote_id,
                        existing: *existing,
                    })
                }
                _ => Ok(()),
            },
            (None, Some(foreign_id)) => match self.by_foreign.get(&(record.blog, foreign_id)) {
                Some(existing) if *existing != record.local_key => {
                    Err(CoreError::DuplicateForeignId {
                        blog: record.blog,
                        foreign_id,
                        existing: *existing,
                    })
                }
                _ => Ok(()),
            },
            (None, None) => Ok(()),
        }
    }

    fn index(&mut self, record: &PostRecord) {
        match (record.remote_id, record.foreign_id) {
            (Some(remote_id), _) => {
                self.by_remote
                    .insert((record.blog, remote_id), record.local_key);
            }
            (None, Some(foreign_id)) => {
                self.by_foreign
                    .insert((record.blog, foreign_id), record.local_key);
            }
            (None, None) => {}
        }
    }

    fn unindex(&mut self, record: &PostRecord) {
        match (record.remote_id, record.foreign_id) {
            (Some(remote_id), _) => {
                self.by_remote.remove(&(record.blog, remote_id));
            }
            (None, Some(foreign_id)) => {
                self.by_foreign.remove(&(record.blog, foreign_id));
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{PostFields, PostStatus};
    use crate::types::Timestamp;

    fn draft(blog: u64) -> PostRecord {
        PostRecord::new_draft(BlogId::new(blog), PostType::Post, PostFields::new("t", "c"))
    }

    fn synced(blog: u64, remote: u64) -> PostRecord {
        let mut record = draft(blog);
        record
            .confirm_push(RemotePostId::new(remote), Timestamp::from_millis(1))
            .unwrap();
        record
    }

    #[test]
    fn insert_and_lookup() {
        let record = synced(1, 42);
        let state = StoreState::from_records([record.clone()]).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(
            state.by_remote_id(BlogId::new(1), RemotePostId::new(42)),
            Some(&record)
        );
        assert!(state
            .by_remote_id(BlogId::new(2), RemotePostId::new(42))
            .is_none());
    }

    #[test]
    fn remote_id_unique_per_blog() {
        let err = StoreState::from_records([synced(1, 42), synced(1, 42)]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRemoteId { .. }));

        // Same remote ID in another blog is fine
        assert!(StoreState::from_records([synced(1, 42), synced(2, 42)]).is_ok());
    }

    #[test]
    fn foreign_id_unique_among_local_records() {
        let a = draft(1);
        let mut b = draft(1);
        b.foreign_id = a.foreign_id;
        let err = StoreState::from_records([a.clone(), b]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateForeignId { .. }));

        // Once uploaded, a record leaves the foreign index
        let mut c = synced(1, 7);
        c.foreign_id = a.foreign_id;
        assert!(StoreState::from_records([a, c]).is_ok());
    }

    #[test]
    fn failed_transaction_changes_nothing() {
        let existing = synced(1, 42);
        let mut state = StoreState::from_records([existing.clone()]).unwrap();

        let mut tx = Transaction::new();
        tx.insert(draft(1));
        tx.insert(synced(1, 42));
        assert!(state.apply(&tx).is_err());
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(existing.local_key), Some(&existing));
    }

    #[test]
    fn update_moves_draft_from_foreign_to_remote_index() {
        let record = draft(1);
        let foreign = record.foreign_id.unwrap();
        let mut state = StoreState::from_records([record.clone()]).unwrap();
        assert!(state.by_foreign_id(BlogId::new(1), foreign).is_some());

        let mut matched = record;
        matched
            .confirm_push(RemotePostId::new(9), Timestamp::from_millis(5))
            .unwrap();
        let mut tx = Transaction::new();
        tx.update(matched.clone());
        state.apply(&tx).unwrap();

        assert!(state.by_foreign_id(BlogId::new(1), foreign).is_none());
        assert_eq!(
            state.by_remote_id(BlogId::new(1), RemotePostId::new(9)),
            Some(&matched)
        );
    }

    #[test]
    fn update_cannot_drop_remote_id() {
        let record = synced(1, 42);
        let mut state = StoreState::from_records([record.clone()]).unwrap();

        let mut reverted = record;
        reverted.remote_id = None;
        let mut tx = Transaction::new();
        tx.update(reverted);
        assert!(matches!(
            state.apply(&tx),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn missing_records_are_reported() {
        let mut state = StoreState::new();
        let mut tx = Transaction::new();
        tx.delete(LocalKey::new());
        assert!(matches!(
            state.apply(&tx),
            Err(CoreError::RecordNotFound { .. })
        ));

        let mut tx = Transaction::new();
        tx.update(draft(1));
        assert!(matches!(
            state.apply(&tx),
            Err(CoreError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn existing_filters_on_canonical_status() {
        let mut published = synced(1, 1);
        published.fields.status = PostStatus::Publish;
        let mut drafted = synced(1, 2);
        drafted.fields.status = PostStatus::Draft;
        let page = PostRecord::new_draft(BlogId::new(1), PostType::Page, PostFields::default());
        let state = StoreState::from_records([published, drafted, page]).unwrap();

        let filter = StatusFilter::only([PostStatus::Draft]);
        let drafts = state.existing(BlogId::new(1), PostType::Post, &filter);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].remote_id, Some(RemotePostId::new(2)));
        assert_eq!(
            state
                .existing(BlogId::new(1), PostType::Post, &StatusFilter::Any)
                .len(),
            2
        );
    }
}
