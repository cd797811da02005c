//! Directory scans and reconciliation against remembered order.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::fs::FileSystem;

/// Track names found in a story directory, oldest file first.
///
/// Only regular entries named `<name>.<audioExt>` count; the WIP recording is
/// skipped. Equal modification times are ordered by name.
pub fn scan_tracks(fs: &dyn FileSystem, dir: &Path, config: &StoreConfig) -> Result<Vec<String>> {
    let mut found: Vec<_> = fs
        .list(dir)
        .map_err(|e| StoreError::io(dir, e))?
        .into_iter()
        .filter(|entry| !entry.is_dir)
        .filter_map(|entry| {
            let name = config.track_name(&entry.name)?.to_string();
            Some((entry.modified, name))
        })
        .collect();

    found.sort();
    Ok(found.into_iter().map(|(_, name)| name).collect())
}

/// Story directory names in a library, skipping hidden entries.
pub fn scan_stories(fs: &dyn FileSystem, dir: &Path) -> Result<BTreeSet<String>> {
    Ok(fs
        .list(dir)
        .map_err(|e| StoreError::io(dir, e))?
        .into_iter()
        .filter(|entry| entry.is_dir && !entry.name.starts_with('.'))
        .map(|entry| entry.name)
        .collect())
}

/// Merge a fresh scan into the remembered order.
///
/// Remembered tracks that are still present keep their relative order;
/// newly found tracks follow in scan order. Returns `None` when the result
/// equals `current`.
pub fn reconcile(current: &[String], found: &[String]) -> Option<Vec<String>> {
    let found_set: HashSet<&str> = found.iter().map(String::as_str).collect();
    let known: HashSet<&str> = current.iter().map(String::as_str).collect();

    let existing = current.iter().filter(|t| found_set.contains(t.as_str()));
    let added = found.iter().filter(|t| !known.contains(t.as_str()));
    let next: Vec<String> = existing.chain(added).cloned().collect();

    if next == current {
        return None;
    }
    Some(next)
}
