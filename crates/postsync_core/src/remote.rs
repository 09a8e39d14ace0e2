//! Remote post representation.

use crate::post::{
    AuthorRef, AutosaveSnapshot, ForeignId, LocalKey, PostFields, PostRecord, PostStatus,
    SyncStatus,
};
use crate::types::{BlogId, PostType, RemotePostId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A taxonomy term as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTerm {
    /// Taxonomy, e.g. `category` or `post_tag`.
    pub taxonomy: String,
    /// Server term ID, when the server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_id: Option<u64>,
    /// Term name.
    pub name: String,
}

impl RemoteTerm {
    /// Creates a term without a server ID.
    pub fn new(taxonomy: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            term_id: None,
            name: name.into(),
        }
    }
}

/// Immutable snapshot of a post as returned by the server.
///
/// Built fresh for every fetch and dropped after reconciliation. The shape
/// is transport-agnostic: whatever wire format the transport speaks, it
/// hands the engine values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    /// Server identity.
    pub remote_id: RemotePostId,
    /// Owning blog.
    pub blog: BlogId,
    /// Post or page.
    pub post_type: PostType,
    /// Author.
    #[serde(default)]
    pub author: AuthorRef,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Body.
    #[serde(default)]
    pub content: String,
    /// Excerpt.
    #[serde(default)]
    pub excerpt: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Server status string (`draft`, `publish`, `trash`, ...).
    #[serde(default)]
    pub status: String,
    /// Publish date.
    #[serde(default)]
    pub published_at: Option<Timestamp>,
    /// Canonical permalink.
    #[serde(default)]
    pub permalink: Option<String>,
    /// Custom metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Taxonomy terms in server order.
    #[serde(default)]
    pub terms: Vec<RemoteTerm>,
    /// Server modification time.
    pub modified: Timestamp,
    /// Server-side autosave, if any.
    #[serde(default)]
    pub autosave: Option<AutosaveSnapshot>,
    /// Correlation token the client supplied when it uploaded the post.
    #[serde(default)]
    pub correlation: Option<ForeignId>,
}

impl RemotePost {
    /// Creates a minimal remote post.
    pub fn new(
        remote_id: RemotePostId,
        blog: BlogId,
        post_type: PostType,
        title: impl Into<String>,
        modified: Timestamp,
    ) -> Self {
        Self {
            remote_id,
            blog,
            post_type,
            author: AuthorRef::default(),
            title: title.into(),
            content: String::new(),
            excerpt: String::new(),
            slug: String::new(),
            status: PostStatus::Publish.as_str().to_string(),
            published_at: None,
            permalink: None,
            metadata: BTreeMap::new(),
            terms: Vec::new(),
            modified,
            autosave: None,
            correlation: None,
        }
    }

    /// Returns the parsed publication status.
    pub fn post_status(&self) -> PostStatus {
        PostStatus::parse(&self.status)
    }

    /// Normalizes the remote content into local field form.
    pub fn fields(&self) -> PostFields {
        let mut fields = PostFields {
            title: self.title.clone(),
            content: self.content.clone(),
            excerpt: self.excerpt.clone(),
            slug: self.slug.clone(),
            author: self.author.clone(),
            status: self.post_status(),
            published_at: self.published_at,
            permalink: self.permalink.clone(),
            terms: BTreeMap::new(),
            metadata: self.metadata.clone(),
        };
        for term in &self.terms {
            fields.add_term(term.taxonomy.clone(), term.name.clone());
        }
        fields
    }

    /// Builds a brand-new synced record for a post with no local twin.
    pub fn to_record(&self) -> PostRecord {
        PostRecord {
            local_key: LocalKey::new(),
            blog: self.blog,
            post_type: self.post_type,
            remote_id: Some(self.remote_id),
            foreign_id: self.correlation,
            sync_status: SyncStatus::Synced,
            fields: self.fields(),
            remote_modified: Some(self.modified),
            revision: None,
            autosave: self.autosave.clone(),
            confirmed_changes_at: None,
            created_at: Timestamp::now(),
        }
    }
}
