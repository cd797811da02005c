//! Manifest persistence and the story state transitions.
//!
//! [`ManifestStore`] lives on a story's executor worker. Every operation
//! validates against the current snapshot before touching the disk and
//! returns the new snapshot to publish, `Ok(None)` for a no-op, or an error
//! that leaves the snapshot unchanged.
//!
//! # File Structure
//!
//! ```text
//! {story_dir}/
//!   ├── story.json              manifest (replaced via story.json.tmp)
//!   ├── {track}.3gp             one file per track
//!   └── _new_recording.3gp      in-progress recording, never a track
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{CorruptManifestPolicy, StoreConfig};
use crate::error::{Rejected, Result, StoreError};
use crate::executor::assert_blocking_context;
use crate::fs::FileSystem;
use crate::manifest::Manifest;
use crate::scanner::{reconcile, scan_tracks};

/// Owner of one story's manifest snapshot.
pub struct ManifestStore {
    dir: PathBuf,
    config: Arc<StoreConfig>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    current: Arc<Manifest>,
}

impl ManifestStore {
    /// Load the manifest in `dir`, or create and persist an empty one.
    ///
    /// A manifest that cannot be read or parsed is treated as absent, after
    /// applying the configured [`CorruptManifestPolicy`].
    pub fn load_or_create(
        dir: impl Into<PathBuf>,
        config: Arc<StoreConfig>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        assert_blocking_context("ManifestStore load_or_create");

        let mut store = Self {
            dir: dir.into(),
            current: Arc::new(Manifest::empty(clock.now())),
            config,
            fs,
            clock,
        };

        match store.load() {
            Ok(Some(manifest)) => {
                debug!(
                    "Loaded manifest {} with {} tracks",
                    store.manifest_path().display(),
                    manifest.len()
                );
                let sanitized = store.sanitize(manifest);
                store.current = Arc::new(sanitized);
                return store;
            }
            Ok(None) => {
                debug!("No manifest at {}", store.manifest_path().display());
            }
            Err(e) => {
                error!("Cannot load manifest, re-creating it: {}", e);
                if store.config.corrupt_manifest == CorruptManifestPolicy::Backup {
                    store.backup_corrupt();
                }
            }
        }

        if let Err(e) = store.persist(&store.current) {
            error!("Failed to save new manifest: {}", e);
        } else {
            info!("Created manifest {}", store.manifest_path().display());
        }
        store
    }

    pub fn current(&self) -> &Arc<Manifest> {
        &self.current
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.manifest_path(&self.dir)
    }

    pub fn track_path(&self, name: &str) -> PathBuf {
        self.config.track_path(&self.dir, name)
    }

    pub fn wip_path(&self) -> PathBuf {
        self.config.wip_path(&self.dir)
    }

    /// Rescan the directory, keeping remembered order for surviving tracks
    /// and appending new ones oldest first.
    pub fn refresh(&mut self) -> Result<Option<Arc<Manifest>>> {
        assert_blocking_context("ManifestStore refresh");

        let found = scan_tracks(self.fs.as_ref(), &self.dir, &self.config)?;
        let Some(tracks) = reconcile(&self.current.tracks, &found) else {
            debug!("Refresh of {} found no changes", self.dir.display());
            return Ok(None);
        };

        let kept = self
            .current
            .tracks
            .iter()
            .filter(|t| tracks.contains(t))
            .count();
        debug!(
            "Refresh of {} removed {}, added {}",
            self.dir.display(),
            self.current.len() - kept,
            tracks.len() - kept
        );

        let next = self.current.with_tracks(tracks, self.clock.now());
        Ok(Some(self.commit(next)))
    }

    /// Move `name` to `position`.
    pub fn move_track(&mut self, name: &str, position: usize) -> Result<Option<Arc<Manifest>>> {
        assert_blocking_context("ManifestStore move");

        let Some(next) = self.current.with_moved(name, position, self.clock.now())? else {
            debug!("Track \"{}\" already at position {}", name, position);
            return Ok(None);
        };
        Ok(Some(self.commit(next)))
    }

    /// Rename `source` into the story as track `name`, appended last.
    pub fn add(&mut self, name: &str, source: &Path) -> Result<Option<Arc<Manifest>>> {
        assert_blocking_context("ManifestStore add");

        self.config.validate_name(name)?;
        if !self.fs.is_file(source) {
            return Err(Rejected::SourceMissing(source.to_path_buf()).into());
        }
        let next = self.current.with_added(name, self.clock.now())?;
        let dest = self.track_path(name);
        if self.fs.exists(&dest) {
            return Err(Rejected::DestinationExists(dest).into());
        }

        self.fs
            .rename(source, &dest)
            .map_err(|e| StoreError::io(source, e))?;

        Ok(Some(self.commit(next)))
    }

    /// Remove track `name` and its file.
    pub fn delete(&mut self, name: &str) -> Result<Option<Arc<Manifest>>> {
        assert_blocking_context("ManifestStore delete");

        let next = self.current.without(name, self.clock.now())?;
        let path = self.track_path(name);
        if self.fs.is_file(&path) {
            self.fs
                .remove_file(&path)
                .map_err(|e| StoreError::io(&path, e))?;
        } else {
            warn!("Deleting track \"{}\" with no file at {}", name, path.display());
        }

        Ok(Some(self.commit(next)))
    }

    /// Delete the in-progress recording if there is one.
    pub fn discard_wip(&self) -> Result<bool> {
        assert_blocking_context("ManifestStore discard_wip");

        let wip = self.wip_path();
        if !self.fs.is_file(&wip) {
            return Ok(false);
        }
        self.fs
            .remove_file(&wip)
            .map_err(|e| StoreError::io(&wip, e))?;
        Ok(true)
    }

    /// Persist `next` and make it current.
    ///
    /// The disk change that led here cannot be undone, so a failed save is
    /// logged and the snapshot still advances; the next save rewrites it.
    fn commit(&mut self, next: Manifest) -> Arc<Manifest> {
        if let Err(e) = self.persist(&next) {
            error!("Failed to save manifest for {}: {}", self.dir.display(), e);
        }
        self.current = Arc::new(next);
        Arc::clone(&self.current)
    }

    fn persist(&self, manifest: &Manifest) -> Result<()> {
        let path = self.manifest_path();
        let temp_path = self.dir.join(format!("{}.tmp", self.config.manifest_file));

        let bytes = serde_json::to_vec(manifest)?;

        // Write to temp file
        self.fs
            .write(&temp_path, &bytes)
            .map_err(|e| StoreError::io(&temp_path, e))?;

        // Atomic rename
        self.fs
            .rename(&temp_path, &path)
            .map_err(|e| StoreError::io(&path, e))?;

        debug!("Saved manifest {}", path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !self.fs.is_file(&path) {
            return Ok(None);
        }

        let bytes = self.fs.read(&path).map_err(|e| StoreError::io(&path, e))?;
        let manifest =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse { path, source })?;
        Ok(Some(manifest))
    }

    fn backup_corrupt(&self) {
        let path = self.manifest_path();
        if !self.fs.is_file(&path) {
            return;
        }
        let backup = self.dir.join(format!("{}.corrupt", self.config.manifest_file));
        match self.fs.rename(&path, &backup) {
            Ok(()) => warn!("Moved unreadable manifest to {}", backup.display()),
            Err(e) => error!("Failed to back up unreadable manifest: {}", e),
        }
    }

    /// Drop duplicate, reserved and invalid names from a hand-edited manifest.
    fn sanitize(&self, manifest: Manifest) -> Manifest {
        let mut seen = HashSet::new();
        let tracks: Vec<String> = manifest
            .tracks
            .iter()
            .filter(|t| self.config.validate_name(t).is_ok() && seen.insert(t.as_str()))
            .cloned()
            .collect();

        if tracks.len() == manifest.tracks.len() {
            return manifest;
        }

        warn!(
            "Manifest {} had {} invalid or duplicate entries",
            self.manifest_path().display(),
            manifest.tracks.len() - tracks.len()
        );
        let cleaned = manifest.with_tracks(tracks, self.clock.now());
        if let Err(e) = self.persist(&cleaned) {
            error!("Failed to save cleaned manifest: {}", e);
        }
        cleaned
    }
}
