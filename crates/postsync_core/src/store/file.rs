//! Directory-backed post store.

use crate::error::{CoreError, CoreResult};
use crate::post::{ForeignId, LocalKey, PostRecord, StatusFilter};
use crate::store::{PostStore, StoreState, Transaction};
use crate::types::{BlogId, PostType, RemotePostId};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const DATA_FILE: &str = "posts.cbor";
const DATA_TEMP: &str = "posts.cbor.tmp";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    format_version: u32,
    records: Vec<PostRecord>,
}

/// Post store persisted as a single CBOR document.
///
/// Holds an exclusive advisory lock on the directory for its lifetime, so
/// only one process writes a store at a time. Every commit rewrites the
/// data file through a temp file and rename, so a crash leaves either the
/// previous or the next state on disk.
#[derive(Debug)]
pub struct FilePostStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    _lock_file: File,
}

impl FilePostStore {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// - the directory is missing and `create_if_missing` is false
    /// - another process holds the lock ([`CoreError::StoreLocked`])
    /// - the data file is corrupt or from an unknown format version
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        let state = Self::load(&path.join(DATA_FILE))?;
        debug!(path = %path.display(), records = state.len(), "opened post store");

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    fn load(data_path: &Path) -> CoreResult<StoreState> {
        if !data_path.exists() {
            return Ok(StoreState::new());
        }
        let reader = BufReader::new(File::open(data_path)?);
        let file: StoreFile =
            ciborium::from_reader(reader).map_err(|e| CoreError::Decode(e.to_string()))?;
        if file.format_version != FORMAT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                file.format_version
            )));
        }
        StoreState::from_records(file.records)
    }

    /// Writes the state to disk:
    /// 1. Write to temporary file
    /// 2. Sync temporary file to disk
    /// 3. Rename temporary file over the data file
    /// 4. Fsync the directory so the rename is durable
    fn persist(&self, state: &StoreState) -> CoreResult<()> {
        let file = StoreFile {
            format_version: FORMAT_VERSION,
            records: state.records().cloned().collect(),
        };
        let mut data = Vec::new();
        ciborium::into_writer(&file, &mut data).map_err(|e| CoreError::Encode(e.to_string()))?;

        let temp_path = self.path.join(DATA_TEMP);
        let mut temp = File::create(&temp_path)?;
        temp.write_all(&data)?;
        temp.sync_all()?;
        drop(temp);

        fs::rename(&temp_path, self.path.join(DATA_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}

impl PostStore for FilePostStore {
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
        if transaction.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write();
        let next = state.staged(&transaction)?;
        self.persist(&next)?;
        debug!(writes = transaction.len(), records = next.len(), "committed transaction");
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostFields;
    use crate::types::Timestamp;
    use tempfile::tempdir;

    fn draft(title: &str) -> PostRecord {
        PostRecord::new_draft(BlogId::new(1), PostType::Post, PostFields::new(title, ""))
    }

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");
        let store = FilePostStore::open(&path, true).unwrap();
        assert!(path.join(LOCK_FILE).exists());
        assert!(store.is_empty());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn open_missing_without_create_fails() {
        let temp = tempdir().unwrap();
        let result = FilePostStore::open(&temp.path().join("nope"), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let _store = FilePostStore::open(temp.path(), true).unwrap();
        let result = FilePostStore::open(temp.path(), true);
        assert!(matches!(result, Err(CoreError::StoreLocked)));
    }

    #[test]
    fn records_survive_reopen() {
        let temp = tempdir().unwrap();
        let mut synced = draft("published");
        synced
            .confirm_push(RemotePostId::new(11), Timestamp::from_millis(9))
            .unwrap();
        let mut edited = draft("local");
        edited.edit().title = "local, edited".into();

        {
            let store = FilePostStore::open(temp.path(), true).unwrap();
            store
                .run_transaction(|tx| {
                    tx.insert(synced.clone());
                    tx.insert(edited.clone());
                    Ok(())
                })
                .unwrap();
        }

        let store = FilePostStore::open(temp.path(), false).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store
                .find_by_remote_id(BlogId::new(1), RemotePostId::new(11))
                .unwrap(),
            Some(synced)
        );
        assert_eq!(store.get(edited.local_key).unwrap(), Some(edited));
        assert!(!temp.path().join(DATA_TEMP).exists());
    }

    #[test]
    fn rejected_commit_leaves_disk_untouched() {
        let temp = tempdir().unwrap();
        let first = draft("first");
        {
            let store = FilePostStore::open(temp.path(), true).unwrap();
            let mut tx = Transaction::new();
            tx.insert(first.clone());
            store.commit(tx).unwrap();

            let mut tx = Transaction::new();
            tx.insert(draft("second"));
            tx.insert(first.clone());
            assert!(matches!(
                store.commit(tx),
                Err(CoreError::RecordExists { .. })
            ));
            assert_eq!(store.len(), 1);
        }

        let store = FilePostStore::open(temp.path(), false).unwrap();
        assert_eq!(store.all_records().unwrap(), vec![first]);
    }

    #[test]
    fn corrupt_data_file_is_rejected() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(DATA_FILE), [0xff, 0xff, 0xff]).unwrap();
        let result = FilePostStore::open(temp.path(), false);
        assert!(matches!(result, Err(CoreError::Decode(_))));
    }
}
