//! Transport collaborator abstraction.

use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use postsync_core::{AuthorId, BlogId, PostType, RemotePost, StatusFilter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    /// Blog to list.
    pub blog: BlogId,
    /// Post type to list.
    pub post_type: PostType,
    /// Publication statuses to include.
    pub status_filter: StatusFilter,
    /// Restrict to posts by this author.
    pub author: Option<AuthorId>,
    /// Page number, starting at 1.
    pub page: u32,
    /// Maximum posts per page.
    pub page_size: u32,
}

/// Fetches pages of remote posts from a server.
///
/// This trait abstracts the network layer. Implementations own wire
/// formats, timeouts and retries; the orchestrator treats any error as
/// fatal to the run.
#[async_trait]
pub trait PostTransport: Send + Sync {
    /// Fetches one page. A page shorter than `page_size` is the last one.
    async fn fetch_posts(&self, query: &FetchQuery) -> Result<Vec<RemotePost>, TransportError>;
}

/// An in-memory server listing for tests and offline runs.
///
/// Serves posts in insertion order, filtered by blog, type, status and
/// author, and paginated by the query.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    posts: Mutex<Vec<RemotePost>>,
    failures: Mutex<HashMap<u32, TransportError>>,
    queries: Mutex<Vec<FetchQuery>>,
    delay: Mutex<Option<Duration>>,
    requests: AtomicUsize,
}

impl MemoryTransport {
    /// Creates an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a listing serving the given posts.
    pub fn with_posts(posts: impl IntoIterator<Item = RemotePost>) -> Self {
        let transport = Self::new();
        transport.posts.lock().extend(posts);
        transport
    }

    /// Adds a post to the end of the listing.
    pub fn push_post(&self, post: RemotePost) {
        self.posts.lock().push(post);
    }

    /// Replaces the whole listing.
    pub fn set_posts(&self, posts: Vec<RemotePost>) {
        *self.posts.lock() = posts;
    }

    /// Makes the next request for `page` fail once with `error`.
    pub fn fail_page(&self, page: u32, error: TransportError) {
        self.failures.lock().insert(page, error);
    }

    /// Delays every response.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of requests served, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<FetchQuery> {
        self.queries.lock().clone()
    }

    fn page_of(&self, query: &FetchQuery) -> Vec<RemotePost> {
        let size = query.page_size.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * size;

        self.posts
            .lock()
            .iter()
            .filter(|post| post.blog == query.blog && post.post_type == query.post_type)
            .filter(|post| query.status_filter.matches(&post.post_status()))
            .filter(|post| query.author.is_none() || post.author.id == query.author)
            .skip(skip)
            .take(size)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PostTransport for MemoryTransport {
    async fn fetch_posts(&self, query: &FetchQuery) -> Result<Vec<RemotePost>, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.lock().remove(&query.page) {
            return Err(error);
        }
        Ok(self.page_of(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsync_core::{PostStatus, RemotePostId, Timestamp};

    fn post(id: u64, status: &str) -> RemotePost {
        let mut post = RemotePost::new(
            RemotePostId::new(id),
            BlogId::new(1),
            PostType::Post,
            format!("Post {id}"),
            Timestamp::from_millis(id as i64),
        );
        post.status = status.to_string();
        post
    }

    fn query(page: u32, page_size: u32) -> FetchQuery {
        FetchQuery {
            blog: BlogId::new(1),
            post_type: PostType::Post,
            status_filter: StatusFilter::Any,
            author: None,
            page,
            page_size,
        }
    }

    #[tokio::test]
    async fn paginates_in_order() {
        let transport = MemoryTransport::with_posts((1..=5).map(|id| post(id, "publish")));

        let first = transport.fetch_posts(&query(1, 2)).await.unwrap();
        let third = transport.fetch_posts(&query(3, 2)).await.unwrap();
        let fourth = transport.fetch_posts(&query(4, 2)).await.unwrap();

        assert_eq!(
            first.iter().map(|p| p.remote_id.as_u64()).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(third.len(), 1);
        assert!(fourth.is_empty());
        assert_eq!(transport.requests(), 3);
    }

    #[tokio::test]
    async fn filters_by_status_and_type() {
        let transport = MemoryTransport::with_posts(vec![
            post(1, "publish"),
            post(2, "draft"),
            post(3, "publish"),
        ]);
        let mut page = post(4, "publish");
        page.post_type = PostType::Page;
        transport.push_post(page);

        let mut q = query(1, 10);
        q.status_filter = StatusFilter::only([PostStatus::Publish]);
        let listed = transport.fetch_posts(&q).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|p| p.post_type == PostType::Post));
    }

    #[tokio::test]
    async fn scripted_failure_fires_once() {
        let transport = MemoryTransport::with_posts(vec![post(1, "publish")]);
        transport.fail_page(1, TransportError::Timeout);

        assert_eq!(
            transport.fetch_posts(&query(1, 10)).await,
            Err(TransportError::Timeout)
        );
        assert_eq!(transport.fetch_posts(&query(1, 10)).await.unwrap().len(), 1);
        assert_eq!(transport.queries().len(), 2);
    }
}
