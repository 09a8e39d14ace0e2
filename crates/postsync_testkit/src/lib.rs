//! # postsync testkit
//!
//! Test utilities for postsync.
//!
//! This crate provides:
//! - Record and remote post builders
//! - Temporary file-backed stores
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use postsync_testkit::prelude::*;
//!
//! #[test]
//! fn draft_survives_purge() {
//!     let draft = RecordBuilder::draft(blog(1)).title("Draft").build();
//!     // ... reconcile against a remote batch
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
