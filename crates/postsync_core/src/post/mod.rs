//! Post records and their parts.

mod fields;
mod id;
mod record;
mod status;

pub use fields::{AuthorRef, AutosaveSnapshot, PostField, PostFields};
pub use id::{ForeignId, LocalKey};
pub use record::{PostRecord, Revision};
pub use status::{PostStatus, StatusFilter, SyncStatus};
