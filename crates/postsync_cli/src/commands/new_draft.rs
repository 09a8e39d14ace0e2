//! New-draft command implementation.

use postsync_core::{BlogId, FilePostStore, PostFields, PostRecord, PostStore, PostType};
use std::path::Path;

/// Creates a draft in the store and returns it.
pub fn create_draft(
    path: &Path,
    blog: u64,
    title: &str,
    content: &str,
) -> Result<PostRecord, Box<dyn std::error::Error>> {
    let store = FilePostStore::open(path, true)?;
    let draft = PostRecord::new_draft(
        BlogId::new(blog),
        PostType::Post,
        PostFields::new(title, content),
    );

    store.run_transaction(|tx| {
        tx.insert(draft.clone());
        Ok(())
    })?;
    tracing::debug!(local_key = %draft.local_key, "draft created");
    Ok(draft)
}

/// Runs the new-draft command.
pub fn run(
    path: &Path,
    blog: u64,
    title: &str,
    content: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let draft = create_draft(path, blog, title, content)?;
    println!("local key:  {}", draft.local_key);
    if let Some(foreign_id) = draft.foreign_id {
        println!("foreign ID: {}", foreign_id);
    }
    Ok(())
}
