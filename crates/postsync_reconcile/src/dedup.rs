//! Foreign-ID resolution of local drafts against remote posts.
//!
//! A draft created on this device carries a random foreign ID. When the
//! server echoes that token back as the correlation field of a remote
//! post, the two are the same logical post. Without the token no match
//! is attempted: content similarity is never used, so a draft uploaded
//! through some other path shows up as a duplicate rather than being
//! merged into the wrong post.

use crate::error::{ReconcileError, ReconcileResult};
use postsync_core::{BlogId, ForeignId, PostRecord, PostType, RemotePost};
use std::collections::HashMap;

/// Index of remote-less local records by foreign ID.
#[derive(Debug, Default)]
pub struct ForeignIdResolver<'a> {
    drafts: HashMap<(BlogId, PostType, ForeignId), &'a PostRecord>,
}

impl<'a> ForeignIdResolver<'a> {
    /// Indexes the records without a remote ID.
    ///
    /// Records that already have a remote ID are skipped. Two drafts with
    /// the same foreign ID in one blog are an invariant violation.
    pub fn new(records: impl IntoIterator<Item = &'a PostRecord>) -> ReconcileResult<Self> {
        let mut drafts: HashMap<(BlogId, PostType, ForeignId), &'a PostRecord> = HashMap::new();
        let mut by_blog: HashMap<(BlogId, ForeignId), &'a PostRecord> = HashMap::new();

        for record in records {
            if record.has_remote() {
                continue;
            }
            let Some(foreign_id) = record.foreign_id else {
                continue;
            };
            if let Some(first) = by_blog.insert((record.blog, foreign_id), record) {
                return Err(ReconcileError::DuplicateLocalForeignId {
                    blog: record.blog,
                    foreign_id,
                    first: first.local_key,
                    second: record.local_key,
                });
            }
            drafts.insert((record.blog, record.post_type, foreign_id), record);
        }
        Ok(Self { drafts })
    }

    /// Returns the draft the remote post is the server twin of, if any.
    pub fn resolve(&self, remote: &RemotePost) -> Option<&'a PostRecord> {
        let correlation = remote.correlation?;
        self.drafts
            .get(&(remote.blog, remote.post_type, correlation))
            .copied()
    }

    /// Returns the number of indexed drafts.
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    /// Returns true if no drafts are indexed.
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
