//! # postsync core
//!
//! Data model and local store for postsync.
//!
//! This crate provides:
//! - Identifiers (`BlogId`, `RemotePostId`, `LocalKey`, `ForeignId`)
//! - `PostRecord` with its revision and autosave layers
//! - `RemotePost`, the server-side representation fetched during sync
//! - The `PostStore` collaborator trait with in-memory and file-backed stores
//!
//! ## Key Invariants
//!
//! - A `LocalKey` never changes and is never reused
//! - A `remote_id` is unique per blog and never reverts once assigned
//! - A `foreign_id` is unique per blog among records without a `remote_id`
//! - Store commits are all-or-nothing

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod post;
mod remote;
pub mod store;
mod types;

pub use error::{CoreError, CoreResult};
pub use post::{
    AuthorRef, AutosaveSnapshot, ForeignId, LocalKey, PostField, PostFields, PostRecord,
    PostStatus, Revision, StatusFilter, SyncStatus,
};
pub use remote::{RemotePost, RemoteTerm};
pub use store::{FilePostStore, MemoryPostStore, PendingWrite, PostStore, StoreState, Transaction};
pub use types::{AuthorId, BlogId, PostType, RemotePostId, Timestamp};
