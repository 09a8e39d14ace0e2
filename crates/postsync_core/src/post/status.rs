//! Sync and publication status.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Where a record stands relative to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Never uploaded.
    Local,
    /// Upload queued.
    PendingPush,
    /// Upload in flight.
    Pushing,
    /// Local content matches the last known server content.
    Synced,
    /// The last upload failed; local content is ahead of the server.
    PushFailed {
        /// Error reported by the upload attempt.
        error: String,
        /// When the attempt failed.
        failed_at: Timestamp,
    },
}

impl SyncStatus {
    /// Returns true if local content matches the server.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    /// Returns true if an upload is queued or in flight.
    pub fn is_upload_pending(&self) -> bool {
        matches!(self, SyncStatus::PendingPush | SyncStatus::Pushing)
    }

    /// Returns true if the last upload failed.
    pub fn is_push_failed(&self) -> bool {
        matches!(self, SyncStatus::PushFailed { .. })
    }

    /// Short lowercase name, used for summaries and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::PendingPush => "pending_push",
            SyncStatus::Pushing => "pushing",
            SyncStatus::Synced => "synced",
            SyncStatus::PushFailed { .. } => "push_failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::PushFailed { error, .. } => write!(f, "push_failed({error})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Publication status as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostStatus {
    /// Draft.
    Draft,
    /// Pending review.
    Pending,
    /// Published privately.
    Private,
    /// Published.
    Publish,
    /// Scheduled for future publication.
    Scheduled,
    /// Trashed.
    Trash,
    /// Any status this client does not know about.
    Other(String),
}

impl PostStatus {
    /// Returns the server string for this status.
    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
            PostStatus::Publish => "publish",
            PostStatus::Scheduled => "future",
            PostStatus::Trash => "trash",
            PostStatus::Other(raw) => raw,
        }
    }

    /// Parses a server string. Unknown values are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "draft" => PostStatus::Draft,
            "pending" => PostStatus::Pending,
            "private" => PostStatus::Private,
            "publish" => PostStatus::Publish,
            "future" | "scheduled" => PostStatus::Scheduled,
            "trash" => PostStatus::Trash,
            _ => PostStatus::Other(raw.trim().to_string()),
        }
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PostStatus::parse(s))
    }
}

impl From<String> for PostStatus {
    fn from(raw: String) -> Self {
        PostStatus::parse(&raw)
    }
}

impl From<PostStatus> for String {
    fn from(status: PostStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Restricts a listing to a set of publication statuses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Every status.
    #[default]
    Any,
    /// Only the listed statuses.
    Only(BTreeSet<PostStatus>),
}

impl StatusFilter {
    /// Creates a filter from a list of statuses; an empty list means any.
    pub fn only(statuses: impl IntoIterator<Item = PostStatus>) -> Self {
        let set: BTreeSet<_> = statuses.into_iter().collect();
        if set.is_empty() {
            StatusFilter::Any
        } else {
            StatusFilter::Only(set)
        }
    }

    /// Returns true if the status passes the filter.
    pub fn matches(&self, status: &PostStatus) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Only(set) => set.contains(status),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::Any => f.write_str("any"),
            StatusFilter::Only(set) => {
                let names: Vec<&str> = set.iter().map(PostStatus::as_str).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_status_parse() {
        assert_eq!(PostStatus::parse("publish"), PostStatus::Publish);
        assert_eq!(PostStatus::parse("future"), PostStatus::Scheduled);
        assert_eq!(PostStatus::parse(" Draft "), PostStatus::Draft);
        assert_eq!(PostStatus::parse(""), PostStatus::Draft);
        assert_eq!(
            PostStatus::parse("inherit"),
            PostStatus::Other("inherit".into())
        );
        assert_eq!(PostStatus::Scheduled.as_str(), "future");
    }

    #[test]
    fn status_filter_matches() {
        let filter = StatusFilter::only([PostStatus::Draft, PostStatus::Pending]);
        assert!(filter.matches(&PostStatus::Draft));
        assert!(!filter.matches(&PostStatus::Publish));
        assert!(StatusFilter::Any.matches(&PostStatus::Trash));
        assert_eq!(StatusFilter::only(Vec::new()), StatusFilter::Any);
    }

    #[test]
    fn sync_status_checks() {
        assert!(SyncStatus::Synced.is_synced());
        assert!(SyncStatus::Pushing.is_upload_pending());
        assert!(SyncStatus::PendingPush.is_upload_pending());
        let failed = SyncStatus::PushFailed {
            error: "HTTP 500".into(),
            failed_at: Timestamp::from_millis(1),
        };
        assert!(failed.is_push_failed());
        assert!(!failed.is_synced());
        assert_eq!(failed.to_string(), "push_failed(HTTP 500)");
        assert_eq!(SyncStatus::Local.label(), "local");
    }
}
