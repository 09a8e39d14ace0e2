//! # postsync engine
//!
//! Paginated sync orchestrator for postsync.
//!
//! This crate provides:
//! - Sync state machine (idle → fetching → reconciling → applying → done)
//! - Transport abstraction and an in-memory server listing
//! - Store-backed plan applier
//! - Per-key run serialization and cancellation
//!
//! ## Architecture
//!
//! A run walks the server listing page by page. Each page is reconciled
//! against a fresh snapshot of the local store and committed in one
//! transaction before the next page is fetched.
//!
//! ## Key Invariants
//!
//! - Sync is page-atomic, not run-atomic: a failed run keeps the pages it
//!   already committed and reports how many
//! - Purge only runs with the last page of a complete listing
//! - The core never retries a failed fetch
//! - At most one run per blog and post type writes at a time
//! - A page whose commit has started always finishes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod config;
mod error;
mod registry;
mod state;
mod transport;

pub use applier::{plan_transaction, PlanApplier};
pub use config::{SyncConfig, DEFAULT_PAGE_SIZE};
pub use error::{SyncError, SyncFailure, SyncResult, TransportError};
pub use registry::{CancelToken, SyncKey};
pub use state::{Listing, SyncOrchestrator, SyncPhase, SyncReport, SyncRequest, SyncStats};
pub use transport::{FetchQuery, MemoryTransport, PostTransport};
