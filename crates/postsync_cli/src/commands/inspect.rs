//! Inspect command implementation.

use postsync_core::{FilePostStore, PostRecord, PostStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Number of records.
    pub record_count: usize,
    /// Records without a remote ID.
    pub local_only: usize,
    /// Records holding unsaved edits.
    pub with_revision: usize,
    /// Records per sync status.
    pub by_sync_status: BTreeMap<String, usize>,
    /// Records per blog and post type.
    pub by_blog_and_type: BTreeMap<String, usize>,
}

impl InspectResult {
    /// Summarizes a set of records.
    pub fn from_records(path: &Path, records: &[PostRecord]) -> Self {
        let mut result = InspectResult {
            path: path.display().to_string(),
            record_count: records.len(),
            local_only: 0,
            with_revision: 0,
            by_sync_status: BTreeMap::new(),
            by_blog_and_type: BTreeMap::new(),
        };

        for record in records {
            if !record.has_remote() {
                result.local_only += 1;
            }
            if record.has_revision() {
                result.with_revision += 1;
            }
            *result
                .by_sync_status
                .entry(record.sync_status.label().to_string())
                .or_insert(0) += 1;
            *result
                .by_blog_and_type
                .entry(format!("{}/{}", record.blog, record.post_type))
                .or_insert(0) += 1;
        }
        result
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }

    let store = FilePostStore::open(path, false)?;
    let result = InspectResult::from_records(path, &store.all_records()?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("Records: {}", result.record_count);
    println!("  local only:    {}", result.local_only);
    println!("  with revision: {}", result.with_revision);

    println!();
    println!("By sync status:");
    for (status, count) in &result.by_sync_status {
        println!("  {:<14} {}", status, count);
    }

    println!();
    println!("By blog and type:");
    for (key, count) in &result.by_blog_and_type {
        println!("  {:<14} {}", key, count);
    }
}
