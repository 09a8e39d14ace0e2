//! Core type definitions for postsync.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a blog (site) on the content server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlogId(pub u64);

impl BlogId {
    /// Creates a new blog ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blog:{}", self.0)
    }
}

/// Server-assigned post identifier.
///
/// Servers only hand out positive IDs; zero and negative raw values mean
/// the post has never been uploaded. Deserializing such a value fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct RemotePostId(pub u64);

impl RemotePostId {
    /// Creates a new remote post ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Interprets a raw server value, treating non-positive values as absent.
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|id| *id > 0).map(Self)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for RemotePostId {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| format!("remote post ID must be positive, got {raw}"))
    }
}

impl From<RemotePostId> for u64 {
    fn from(id: RemotePostId) -> Self {
        id.0
    }
}

/// Deserializes an optional remote ID, reading non-positive values as absent.
///
/// # Errors
///
/// Fails if the value is neither null nor an integer.
pub(crate) fn deserialize_optional_remote_id<'de, D>(
    deserializer: D,
) -> Result<Option<RemotePostId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(RemotePostId::from_raw))
}

impl fmt::Display for RemotePostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post:{}", self.0)
    }
}

/// Server-side user identifier of a post author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub u64);

impl AuthorId {
    /// Creates a new author ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "author:{}", self.0)
    }
}

/// Point in time as Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp from Unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
        Self(millis)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Kind of content a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// A blog post.
    Post,
    /// A static page.
    Page,
}

impl PostType {
    /// Returns the server name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PostType::Post => "post",
            PostType::Page => "page",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(PostType::Post),
            "page" => Ok(PostType::Page),
            other => Err(format!("unknown post type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_id_from_raw() {
        assert_eq!(RemotePostId::from_raw(42), Some(RemotePostId::new(42)));
        assert_eq!(RemotePostId::from_raw(0), None);
        assert_eq!(RemotePostId::from_raw(-1), None);
    }

    #[test]
    fn remote_id_rejects_non_positive_on_the_wire() {
        let id: RemotePostId = serde_json::from_str("17").unwrap();
        assert_eq!(id, RemotePostId::new(17));
        assert_eq!(serde_json::to_string(&id).unwrap(), "17");

        assert!(serde_json::from_str::<RemotePostId>("0").is_err());
        assert!(serde_json::from_str::<RemotePostId>("-3").is_err());
    }

    #[test]
    fn optional_remote_id_reads_non_positive_as_none() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "deserialize_optional_remote_id")]
            id: Option<RemotePostId>,
        }

        let read = |json: &str| serde_json::from_str::<Holder>(json).unwrap().id;
        assert_eq!(read(r#"{"id": 5}"#), Some(RemotePostId::new(5)));
        assert_eq!(read(r#"{"id": 0}"#), None);
        assert_eq!(read(r#"{"id": -1}"#), None);
        assert_eq!(read(r#"{"id": null}"#), None);
        assert_eq!(read("{}"), None);
    }

    #[test]
    fn timestamp_ordering() {
        let t1 = Timestamp::from_millis(1_000);
        let t2 = Timestamp::from_millis(2_000);
        assert!(t1 < t2);
        assert!(Timestamp::now() > t2);
    }

    #[test]
    fn post_type_parse() {
        assert_eq!("Page".parse::<PostType>(), Ok(PostType::Page));
        assert_eq!("post".parse::<PostType>(), Ok(PostType::Post));
        assert!("attachment".parse::<PostType>().is_err());
    }

    #[test]
    fn blog_id_display() {
        let b = BlogId::new(7);
        assert_eq!(format!("{b}"), "blog:7");
    }
}
