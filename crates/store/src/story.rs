//! Cloneable façade over one story directory.
//!
//! [`StoryStore`] hides the executor plumbing: every write is queued on the
//! story's worker and returns immediately. Results are only observable as
//! new snapshots on [`StoryStore::updates`]; rejected or failed operations
//! are logged and publish nothing.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::broadcast::{Broadcaster, Subscription};
use crate::context::StoreContext;
use crate::error::Result;
use crate::executor::SerialExecutor;
use crate::manifest::Manifest;
use crate::manifest_store::ManifestStore;

/// State owned by a story's worker thread.
struct StoryWorker {
    store: ManifestStore,
    updates: Broadcaster<Arc<Manifest>>,
}

impl StoryWorker {
    fn update<F>(&mut self, operation: &str, op: F)
    where
        F: FnOnce(&mut ManifestStore) -> Result<Option<Arc<Manifest>>>,
    {
        let dir = self.store.directory().display().to_string();
        match op(&mut self.store) {
            Ok(Some(manifest)) => {
                info!("{} on {}: {} tracks", operation, dir, manifest.len());
                self.updates.publish(manifest);
            }
            Ok(None) => debug!("{} on {} changed nothing", operation, dir),
            Err(e) if e.is_rejection() => warn!("{}() on {} rejected: {}", operation, dir, e),
            Err(e) => error!("{}() on {} failed: {}", operation, dir, e),
        }
    }
}

/// Handle to a story: a directory of clips plus its manifest.
#[derive(Clone)]
pub struct StoryStore {
    dir: PathBuf,
    context: StoreContext,
    executor: SerialExecutor<StoryWorker>,
    updates: Broadcaster<Arc<Manifest>>,
}

impl StoryStore {
    /// Open (or create) the story at `dir` with default collaborators.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        Self::open_with(dir, StoreContext::default())
    }

    /// Open (or create) the story at `dir`.
    ///
    /// The directory is created before returning; the manifest is loaded and
    /// reconciled as the first task on the story's worker.
    pub fn open_with(dir: impl Into<PathBuf>, context: StoreContext) -> io::Result<Self> {
        let dir = dir.into();
        context.fs.create_dir_all(&dir)?;

        let updates = Broadcaster::new();
        let init = {
            let dir = dir.clone();
            let context = context.clone();
            let updates = updates.clone();
            move || {
                let store = ManifestStore::load_or_create(
                    dir,
                    context.config,
                    context.fs,
                    context.clock,
                );
                updates.publish(Arc::clone(store.current()));
                let mut worker = StoryWorker { store, updates };
                worker.update("refresh", ManifestStore::refresh);
                worker
            }
        };

        let executor = SerialExecutor::spawn(format!("story:{}", dir.display()), init)?;
        debug!("Opened story {}", dir.display());

        Ok(Self {
            dir,
            context,
            executor,
            updates,
        })
    }

    /// Subscribe to manifest snapshots, starting with the current one.
    pub fn updates(&self) -> Subscription<Arc<Manifest>> {
        self.updates.subscribe()
    }

    /// The most recently published snapshot, if the worker has loaded one.
    pub fn latest(&self) -> Option<Arc<Manifest>> {
        self.updates.latest()
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// The story's name: the last component of its directory.
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn track_path(&self, name: &str) -> PathBuf {
        self.context.config.track_path(&self.dir, name)
    }

    pub fn wip_recording_path(&self) -> PathBuf {
        self.context.config.wip_path(&self.dir)
    }

    /// Reconcile the manifest with the files on disk.
    pub fn refresh(&self) {
        self.executor
            .submit(|w| w.update("refresh", ManifestStore::refresh));
    }

    /// Move track `name` to `position`.
    pub fn move_track(&self, name: impl Into<String>, position: usize) {
        let name = name.into();
        self.executor
            .submit(move |w| w.update("move", |s| s.move_track(&name, position)));
    }

    /// Move `source` into the story as a new last track called `name`.
    pub fn add_track(&self, name: impl Into<String>, source: impl Into<PathBuf>) {
        let name = name.into();
        let source = source.into();
        self.executor
            .submit(move |w| w.update("add", |s| s.add(&name, &source)));
    }

    /// Delete track `name` and its file.
    pub fn delete_track(&self, name: impl Into<String>) {
        let name = name.into();
        self.executor
            .submit(move |w| w.update("delete", |s| s.delete(&name)));
    }

    /// Promote the in-progress recording to a track called `name`.
    pub fn save_wip_recording(&self, name: impl Into<String>) {
        self.add_track(name, self.wip_recording_path());
    }

    /// Delete the in-progress recording, if any. The manifest is unchanged.
    pub fn discard_wip_recording(&self) {
        self.executor.submit(|w| match w.store.discard_wip() {
            Ok(true) => debug!("Discarded recording in {}", w.store.directory().display()),
            Ok(false) => debug!("No recording to discard"),
            Err(e) => error!("Failed to discard recording: {}", e),
        });
    }

    /// Run `task` serialized with this story's file access.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.executor.submit(move |_| task());
    }

    /// Wait until every operation queued so far has been applied.
    pub async fn flush(&self) {
        self.executor.flush().await;
    }
}

impl std::fmt::Debug for StoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn drain(sub: &mut Subscription<Arc<Manifest>>) -> Vec<Vec<String>> {
        let mut seen = Vec::new();
        while let Some(m) = sub.try_recv() {
            seen.push(m.tracks.clone());
        }
        seen
    }

    #[tokio::test]
    async fn test_open_creates_directory_and_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("bedtime");

        let story = StoryStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        story.flush().await;

        assert!(dir.join("story.json").is_file());
        assert_eq!(story.name(), "bedtime");
        assert!(story.latest().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paths_need_no_io() {
        let temp = TempDir::new().unwrap();
        let story = StoryStore::open(temp.path()).unwrap();
        assert_eq!(story.track_path("intro"), temp.path().join("intro.3gp"));
        assert_eq!(
            story.wip_recording_path(),
            temp.path().join("_new_recording.3gp")
        );
    }

    #[tokio::test]
    async fn test_rejected_operations_publish_nothing() {
        let temp = TempDir::new().unwrap();
        let story = StoryStore::open(temp.path()).unwrap();
        story.flush().await;
        let mut sub = story.updates();
        assert_eq!(sub.recv().await.unwrap().len(), 0);

        story.move_track("ghost", 0);
        story.delete_track("ghost");
        story.save_wip_recording("nothing-recorded");
        story.flush().await;

        assert!(drain(&mut sub).is_empty());
    }

    #[tokio::test]
    async fn test_save_and_discard_wip() {
        let temp = TempDir::new().unwrap();
        let story = StoryStore::open(temp.path()).unwrap();
        let mut sub = story.updates();

        fs::write(story.wip_recording_path(), b"take one").unwrap();
        story.save_wip_recording("first");
        fs::write(temp.path().join("scratch.bin"), b"").unwrap();
        story.flush().await;

        fs::write(story.wip_recording_path(), b"take two").unwrap();
        story.discard_wip_recording();
        story.flush().await;

        let seen = drain(&mut sub);
        assert_eq!(seen.last().unwrap(), &vec!["first".to_string()]);
        assert!(!story.wip_recording_path().exists());
        assert_eq!(fs::read(story.track_path("first")).unwrap(), b"take one");
    }

    #[tokio::test]
    async fn test_schedule_runs_in_order() {
        let temp = TempDir::new().unwrap();
        let story = StoryStore::open(temp.path()).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        fs::write(story.wip_recording_path(), b"x").unwrap();
        story.discard_wip_recording();
        let wip = story.wip_recording_path();
        story.schedule(move || {
            let _ = tx.send(wip.exists());
        });

        assert!(!rx.await.unwrap());
    }
}
