//! Line-oriented input files: vehicle IDs and feature lists.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Reads `path` as one entry per line, trimming whitespace and skipping blank lines.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_lines(&content))
}

pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops repeated vehicle IDs, keeping the first occurrence of each.
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| {
            let first = seen.insert(id.clone());
            if !first {
                warn!(vehicle_id = %id, "Duplicate vehicle id ignored");
            }
            first
        })
        .collect()
}
