//! # postsync reconcile
//!
//! Merges a batch of remote posts into a snapshot of local records.
//!
//! This crate provides:
//! - `Reconciler`, a pure function from (local snapshot, remote batch,
//!   policy) to a `Plan` of inserts, updates, deletes and conflicts
//! - `ForeignIdResolver`, matching local drafts to their server twins
//! - `FieldPartition`, the configurable server-owned vs user-entered split
//!
//! ## Key Invariants
//!
//! - Reconciling the same batch twice yields an empty plan the second time
//! - A record that is not `Synced`, or that holds a revision, is never purged
//! - Pending local edits are never overwritten unless the policy says so;
//!   otherwise the remote side is recorded as a conflict
//! - Inconsistent inputs are reported, never resolved by picking a winner

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod dedup;
mod error;
mod plan;
mod policy;
mod reconciler;

pub use conflict::{content_hash, Conflict, ConflictReason};
pub use dedup::ForeignIdResolver;
pub use error::{ReconcileError, ReconcileResult};
pub use plan::{MatchKind, Plan, PlanCounts, PlanDelete, PlanUpdate, UpdateOutcome};
pub use policy::{FieldPartition, PurgeScope, ReconcilePolicy};
pub use reconciler::{reconcile, Reconciler};
