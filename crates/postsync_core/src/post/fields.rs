//! Post content fields.

use crate::post::status::PostStatus;
use crate::types::{AuthorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Author attribution of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Server user ID, when known.
    pub id: Option<AuthorId>,
    /// Display name.
    pub display_name: String,
}

impl AuthorRef {
    /// Creates an author reference.
    pub fn new(id: Option<AuthorId>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// The canonical content of a post.
///
/// Terms are grouped per taxonomy and kept sorted, so two field sets
/// describing the same post compare equal regardless of the order the
/// server listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFields {
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Excerpt.
    pub excerpt: String,
    /// URL slug.
    pub slug: String,
    /// Author.
    pub author: AuthorRef,
    /// Publication status.
    pub status: PostStatus,
    /// Publish date; `None` means "publish immediately".
    pub published_at: Option<Timestamp>,
    /// Canonical permalink assigned by the server.
    pub permalink: Option<String>,
    /// Taxonomy name to term names.
    pub terms: BTreeMap<String, BTreeSet<String>>,
    /// Custom metadata.
    pub metadata: BTreeMap<String, String>,
}

impl PostFields {
    /// Creates fields with a title and body, everything else defaulted.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Adds a term to a taxonomy.
    pub fn add_term(&mut self, taxonomy: impl Into<String>, term: impl Into<String>) {
        self.terms
            .entry(taxonomy.into())
            .or_default()
            .insert(term.into());
    }

    /// Returns the terms of a taxonomy.
    pub fn terms_for(&self, taxonomy: &str) -> impl Iterator<Item = &str> {
        self.terms
            .get(taxonomy)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Copies one field from `source`.
    ///
    /// [`PostField::Autosave`] lives on the record, not on the fields, and
    /// is ignored here.
    pub fn copy_field(&mut self, source: &PostFields, field: PostField) {
        match field {
            PostField::Title => self.title.clone_from(&source.title),
            PostField::Content => self.content.clone_from(&source.content),
            PostField::Excerpt => self.excerpt.clone_from(&source.excerpt),
            PostField::Slug => self.slug.clone_from(&source.slug),
            PostField::Author => self.author.clone_from(&source.author),
            PostField::Status => self.status.clone_from(&source.status),
            PostField::PublishDate => self.published_at = source.published_at,
            PostField::Permalink => self.permalink.clone_from(&source.permalink),
            PostField::Terms => self.terms.clone_from(&source.terms),
            PostField::Metadata => self.metadata.clone_from(&source.metadata),
            PostField::Autosave => {}
        }
    }

    /// Returns true if the field holds the same value in both sets.
    pub fn field_eq(&self, other: &PostFields, field: PostField) -> bool {
        match field {
            PostField::Title => self.title == other.title,
            PostField::Content => self.content == other.content,
            PostField::Excerpt => self.excerpt == other.excerpt,
            PostField::Slug => self.slug == other.slug,
            PostField::Author => self.author == other.author,
            PostField::Status => self.status == other.status,
            PostField::PublishDate => self.published_at == other.published_at,
            PostField::Permalink => self.permalink == other.permalink,
            PostField::Terms => self.terms == other.terms,
            PostField::Metadata => self.metadata == other.metadata,
            PostField::Autosave => true,
        }
    }
}

/// Names a single field of a post, for field-level merge decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostField {
    /// [`PostFields::title`].
    Title,
    /// [`PostFields::content`].
    Content,
    /// [`PostFields::excerpt`].
    Excerpt,
    /// [`PostFields::slug`].
    Slug,
    /// [`PostFields::author`].
    Author,
    /// [`PostFields::status`].
    Status,
    /// [`PostFields::published_at`].
    PublishDate,
    /// [`PostFields::permalink`].
    Permalink,
    /// [`PostFields::terms`].
    Terms,
    /// [`PostFields::metadata`].
    Metadata,
    /// The record's autosave snapshot.
    Autosave,
}

impl PostField {
    /// Every field, in declaration order.
    pub const ALL: [PostField; 11] = [
        PostField::Title,
        PostField::Content,
        PostField::Excerpt,
        PostField::Slug,
        PostField::Author,
        PostField::Status,
        PostField::PublishDate,
        PostField::Permalink,
        PostField::Terms,
        PostField::Metadata,
        PostField::Autosave,
    ];

    /// Returns the snake_case name of the field.
    pub const fn as_str(self) -> &'static str {
        match self {
            PostField::Title => "title",
            PostField::Content => "content",
            PostField::Excerpt => "excerpt",
            PostField::Slug => "slug",
            PostField::Author => "author",
            PostField::Status => "status",
            PostField::PublishDate => "publish_date",
            PostField::Permalink => "permalink",
            PostField::Terms => "terms",
            PostField::Metadata => "metadata",
            PostField::Autosave => "autosave",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PostField::ALL
            .into_iter()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| format!("unknown post field: {s}"))
    }
}

/// Last version of the post saved server-side as a draft preview.
///
/// Independent of the local revision: it reflects what the server holds,
/// not what the user is editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveSnapshot {
    /// Autosaved title.
    pub title: String,
    /// Autosaved body.
    pub content: String,
    /// Autosaved excerpt.
    pub excerpt: String,
    /// When the server took the autosave.
    pub modified: Timestamp,
    /// Server identifier of the autosave.
    pub autosave_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_normalized() {
        let mut a = PostFields::new("t", "c");
        a.add_term("post_tag", "rust");
        a.add_term("post_tag", "async");
        a.add_term("post_tag", "rust");

        let mut b = PostFields::new("t", "c");
        b.add_term("post_tag", "async");
        b.add_term("post_tag", "rust");

        assert_eq!(a, b);
        let tags: Vec<&str> = a.terms_for("post_tag").collect();
        assert_eq!(tags, vec!["async", "rust"]);
        assert_eq!(a.terms_for("category").count(), 0);
    }

    #[test]
    fn copy_single_field() {
        let source = PostFields {
            permalink: Some("https://example.com/hello".into()),
            ..PostFields::new("Remote title", "Remote body")
        };
        let mut target = PostFields::new("Local title", "Local body");

        target.copy_field(&source, PostField::Permalink);
        assert_eq!(target.permalink, source.permalink);
        assert_eq!(target.title, "Local title");
        assert!(target.field_eq(&source, PostField::Permalink));
        assert!(!target.field_eq(&source, PostField::Title));
    }

    #[test]
    fn field_names_parse() {
        for field in PostField::ALL {
            assert_eq!(field.as_str().parse::<PostField>(), Ok(field));
        }
        assert!("featured_image".parse::<PostField>().is_err());
    }
}
