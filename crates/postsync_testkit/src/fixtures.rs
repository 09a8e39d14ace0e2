//! Test fixtures and store helpers.
//!
//! Builders for records and remote posts with sensible defaults, and a
//! file-backed store living in a temporary directory.

use postsync_core::{
    AuthorId, AuthorRef, AutosaveSnapshot, BlogId, FilePostStore, ForeignId, LocalKey,
    PostFields, PostRecord, PostStatus, PostStore, PostType, RemotePost, RemotePostId,
    RemoteTerm, SyncStatus, Timestamp,
};
use tempfile::TempDir;

/// Shorthand for a blog ID.
pub fn blog(id: u64) -> BlogId {
    BlogId::new(id)
}

/// Shorthand for a remote post ID.
pub fn remote_id(id: u64) -> RemotePostId {
    RemotePostId::new(id)
}

/// Shorthand for a timestamp.
pub fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

/// Builder for [`PostRecord`] fixtures.
///
/// Defaults: post type `Post`, status `Local`, server status `publish`,
/// body `"body"`.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: PostRecord,
    revision_title: Option<String>,
}

impl RecordBuilder {
    /// Starts a remote-less draft.
    pub fn draft(blog: BlogId) -> Self {
        let mut fields = PostFields::new("Untitled", "body");
        fields.status = PostStatus::Publish;
        Self {
            record: PostRecord::new_draft(blog, PostType::Post, fields),
            revision_title: None,
        }
    }

    /// Starts a synced record with a remote ID and remote modification time.
    pub fn synced(blog: BlogId, remote_id: u64, modified: i64) -> Self {
        let mut builder = Self::draft(blog);
        builder.record.remote_id = Some(RemotePostId::new(remote_id));
        builder.record.remote_modified = Some(Timestamp::from_millis(modified));
        builder.record.sync_status = SyncStatus::Synced;
        builder
    }

    /// Sets the local key.
    pub fn key(mut self, key: LocalKey) -> Self {
        self.record.local_key = key;
        self
    }

    /// Sets the foreign ID.
    pub fn foreign_id(mut self, foreign_id: Option<ForeignId>) -> Self {
        self.record.foreign_id = foreign_id;
        self
    }

    /// Sets the post type.
    pub fn post_type(mut self, post_type: PostType) -> Self {
        self.record.post_type = post_type;
        self
    }

    /// Sets the canonical title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.fields.title = title.into();
        self
    }

    /// Sets the canonical server status.
    pub fn post_status(mut self, status: PostStatus) -> Self {
        self.record.fields.status = status;
        self
    }

    /// Sets the sync status.
    pub fn sync_status(mut self, status: SyncStatus) -> Self {
        self.record.sync_status = status;
        self
    }

    /// Marks the last upload as failed.
    pub fn push_failed(self, error: &str) -> Self {
        self.sync_status(SyncStatus::PushFailed {
            error: error.to_string(),
            failed_at: Timestamp::from_millis(0),
        })
    }

    /// Sets when local edits were last saved.
    pub fn confirmed_at(mut self, millis: i64) -> Self {
        self.record.confirmed_changes_at = Some(Timestamp::from_millis(millis));
        self
    }

    /// Adds an unsaved revision with a new title.
    pub fn revision(mut self, title: impl Into<String>) -> Self {
        self.revision_title = Some(title.into());
        self
    }

    /// Sets the autosave snapshot.
    pub fn autosave(mut self, autosave: AutosaveSnapshot) -> Self {
        self.record.autosave = Some(autosave);
        self
    }

    /// Builds the record.
    pub fn build(self) -> PostRecord {
        let mut record = self.record;
        if let Some(title) = self.revision_title {
            record.edit().title = title;
        }
        record
    }
}

/// Builder for [`RemotePost`] fixtures.
#[derive(Debug, Clone)]
pub struct RemoteBuilder {
    post: RemotePost,
}

impl RemoteBuilder {
    /// Starts a published post with body `"body"`.
    pub fn new(blog: BlogId, remote_id: u64, modified: i64) -> Self {
        let mut post = RemotePost::new(
            RemotePostId::new(remote_id),
            blog,
            PostType::Post,
            "Untitled",
            Timestamp::from_millis(modified),
        );
        post.content = "body".into();
        Self { post }
    }

    /// Starts the server twin of a record: same content, same remote ID.
    ///
    /// Uses the record's foreign ID as the correlation token if it has no
    /// remote ID yet; `fallback_remote_id` becomes the assigned ID.
    pub fn twin_of(record: &PostRecord, fallback_remote_id: u64, modified: i64) -> Self {
        let id = record
            .remote_id
            .map_or(fallback_remote_id, RemotePostId::as_u64);
        let fields = &record.fields;
        let mut builder = Self::new(record.blog, id, modified)
            .post_type(record.post_type)
            .title(fields.title.clone())
            .status(fields.status.as_str());
        builder.post.content.clone_from(&fields.content);
        builder.post.excerpt.clone_from(&fields.excerpt);
        builder.post.slug.clone_from(&fields.slug);
        builder.post.author.clone_from(&fields.author);
        builder.post.published_at = fields.published_at;
        builder.post.permalink.clone_from(&fields.permalink);
        builder.post.metadata.clone_from(&fields.metadata);
        for (taxonomy, names) in &fields.terms {
            for name in names {
                builder.post.terms.push(RemoteTerm::new(taxonomy.clone(), name.clone()));
            }
        }
        if record.remote_id.is_none() {
            builder.post.correlation = record.foreign_id;
        }
        builder
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.post.title = title.into();
        self
    }

    /// Sets the server status string.
    pub fn status(mut self, status: &str) -> Self {
        self.post.status = status.to_string();
        self
    }

    /// Sets the post type.
    pub fn post_type(mut self, post_type: PostType) -> Self {
        self.post.post_type = post_type;
        self
    }

    /// Sets the permalink.
    pub fn permalink(mut self, permalink: impl Into<String>) -> Self {
        self.post.permalink = Some(permalink.into());
        self
    }

    /// Sets the correlation token.
    pub fn correlation(mut self, token: Option<ForeignId>) -> Self {
        self.post.correlation = token;
        self
    }

    /// Adds a term.
    pub fn term(mut self, taxonomy: &str, name: &str) -> Self {
        self.post.terms.push(RemoteTerm::new(taxonomy, name));
        self
    }

    /// Sets the author ID.
    pub fn author(mut self, author: u64, name: &str) -> Self {
        self.post.author = AuthorRef::new(Some(AuthorId::new(author)), name);
        self
    }

    /// Builds the remote post.
    pub fn build(self) -> RemotePost {
        self.post
    }
}

/// A file-backed store in a temporary directory.
///
/// The store holds the directory lock while open. Tests that hand the
/// directory to code opening the store by path call
/// [`TestStore::into_dir`] first and [`TestStore::open`] to look again.
pub struct TestStore {
    /// The store.
    pub store: FilePostStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            FilePostStore::open(temp_dir.path(), true).expect("Failed to open file store");
        Self { store, temp_dir }
    }

    /// Opens the store left in a directory by earlier code.
    pub fn open(temp_dir: TempDir) -> Self {
        let store =
            FilePostStore::open(temp_dir.path(), false).expect("Failed to reopen file store");
        Self { store, temp_dir }
    }

    /// Seeds a fresh store with records.
    pub fn with_records(records: impl IntoIterator<Item = PostRecord>) -> Self {
        let test_store = Self::new();
        test_store
            .store
            .run_transaction(|tx| {
                for record in records {
                    tx.insert(record);
                }
                Ok(())
            })
            .expect("Failed to seed file store");
        test_store
    }

    /// Returns the store directory.
    pub fn path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Closes the store, releasing its lock, and keeps the directory.
    pub fn into_dir(self) -> TempDir {
        let Self { store, temp_dir } = self;
        drop(store);
        temp_dir
    }

    /// Closes the store and opens it again from disk.
    pub fn reopen(self) -> Self {
        Self::open(self.into_dir())
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = FilePostStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
