//! Command implementations for storytap
//!
//! Each command is a separate module that implements its own CLI args and execution logic.
//! Store operations are queued and never report failure directly, so commands flush the
//! store and compare snapshots to tell the user whether anything happened.

mod stories;
mod tracks;
mod watch;

pub use stories::Stories;
pub use tracks::Tracks;
pub use watch::Watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use story_store::{LibraryStore, StoreContext, StoryStore};

use crate::config::CliConfig;

/// Listing output format
#[derive(Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Summary,
    /// JSON output
    Json,
}

/// Open the configured library and wait for its first scan.
async fn open_library(config: &CliConfig) -> Result<LibraryStore> {
    let context = StoreContext::new(config.store.clone());
    let library = LibraryStore::open_with(&config.library_dir, context).with_context(|| {
        format!("Failed to open library: {}", config.library_dir.display())
    })?;
    library.flush().await;
    Ok(library)
}

/// Open an existing story of the configured library.
async fn open_story(config: &CliConfig, name: &str) -> Result<(LibraryStore, StoryStore)> {
    let library = open_library(config).await?;
    let known = library.latest().is_some_and(|data| data.contains(name));
    if !known {
        anyhow::bail!(
            "Story not found: {}\n\nHint: Run `storytap stories list` to see available stories",
            name
        );
    }

    let story = library
        .open_story(name)
        .with_context(|| format!("Failed to open story: {}", name))?;
    story.flush().await;
    Ok((library, story))
}

/// Whether the store published a new snapshot since `before` was taken.
fn changed<T>(before: &Option<Arc<T>>, after: &Option<Arc<T>>) -> bool {
    match (before, after) {
        (Some(before), Some(after)) => !Arc::ptr_eq(before, after),
        (None, None) => false,
        _ => true,
    }
}

/// Fail unless the store published a new snapshot.
fn ensure_changed<T>(before: &Option<Arc<T>>, after: &Option<Arc<T>>, action: &str) -> Result<()> {
    if !changed(before, after) {
        anyhow::bail!("{} made no change (see warnings above)", action);
    }
    Ok(())
}
