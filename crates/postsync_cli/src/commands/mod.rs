//! CLI command implementations.

pub mod inspect;
pub mod new_draft;
pub mod reconcile;
pub mod sync;

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads a JSON document from a file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
    Ok(value)
}
