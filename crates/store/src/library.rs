//! A library: one directory whose subdirectories are stories.
//!
//! Unlike a story, a library keeps no manifest. Its state is simply the set
//! of story directory names, recomputed from disk on [`LibraryStore::refresh`]
//! with no remembered order.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::broadcast::{Broadcaster, Subscription};
use crate::context::StoreContext;
use crate::error::{Rejected, Result, StoreError};
use crate::executor::{SerialExecutor, assert_blocking_context};
use crate::scanner::scan_stories;
use crate::story::StoryStore;

/// Snapshot of the stories in a library, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryData {
    pub stories: BTreeSet<String>,
}

impl LibraryData {
    pub fn contains(&self, name: &str) -> bool {
        self.stories.contains(name)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.stories.iter().map(String::as_str)
    }

    fn with(&self, name: &str) -> Self {
        let mut stories = self.stories.clone();
        stories.insert(name.to_string());
        Self { stories }
    }

    fn without(&self, name: &str) -> Self {
        let mut stories = self.stories.clone();
        stories.remove(name);
        Self { stories }
    }
}

/// Library state owned by the worker thread.
pub(crate) struct LibraryState {
    dir: PathBuf,
    context: StoreContext,
    current: Arc<LibraryData>,
}

impl LibraryState {
    /// Scan `dir`. An unreadable directory starts out as an empty library.
    pub(crate) fn load(dir: PathBuf, context: StoreContext) -> Self {
        assert_blocking_context("LibraryStore load");

        let stories = match scan_stories(context.fs.as_ref(), &dir) {
            Ok(stories) => stories,
            Err(e) => {
                error!("Cannot list library, starting empty: {}", e);
                BTreeSet::new()
            }
        };
        debug!("Loaded library {} with {} stories", dir.display(), stories.len());

        Self {
            dir,
            context,
            current: Arc::new(LibraryData { stories }),
        }
    }

    pub(crate) fn current(&self) -> &Arc<LibraryData> {
        &self.current
    }

    fn story_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Known in the snapshot and present on disk.
    fn ensure_known(&self, name: &str) -> Result<PathBuf> {
        let path = self.story_path(name);
        if !self.current.contains(name) || !self.context.fs.is_dir(&path) {
            return Err(Rejected::UnknownStory(name.to_string()).into());
        }
        Ok(path)
    }

    /// Valid, and neither in the snapshot nor on disk.
    fn ensure_available(&self, name: &str) -> Result<PathBuf> {
        self.context.config.validate_name(name)?;
        let path = self.story_path(name);
        if self.current.contains(name) || self.context.fs.exists(&path) {
            return Err(Rejected::StoryExists(name.to_string()).into());
        }
        Ok(path)
    }

    pub(crate) fn refresh(&mut self) -> Result<Option<Arc<LibraryData>>> {
        assert_blocking_context("LibraryStore refresh");

        let stories = scan_stories(self.context.fs.as_ref(), &self.dir)?;
        if stories == self.current.stories {
            debug!("Refresh of {} found no changes", self.dir.display());
            return Ok(None);
        }
        Ok(Some(self.commit(LibraryData { stories })))
    }

    pub(crate) fn create(&mut self, name: &str) -> Result<Option<Arc<LibraryData>>> {
        assert_blocking_context("LibraryStore create");

        let path = self.ensure_available(name)?;
        self.context
            .fs
            .create_dir_all(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        let next = self.current.with(name);
        Ok(Some(self.commit(next)))
    }

    pub(crate) fn rename(&mut self, old: &str, new: &str) -> Result<Option<Arc<LibraryData>>> {
        assert_blocking_context("LibraryStore rename");

        let from = self.ensure_known(old)?;
        let to = self.ensure_available(new)?;
        self.context
            .fs
            .rename(&from, &to)
            .map_err(|e| StoreError::io(&from, e))?;

        let next = self.current.without(old).with(new);
        Ok(Some(self.commit(next)))
    }

    pub(crate) fn delete(&mut self, name: &str) -> Result<Option<Arc<LibraryData>>> {
        assert_blocking_context("LibraryStore delete");

        let path = self.ensure_known(name)?;
        self.context
            .fs
            .remove_dir_all(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        let next = self.current.without(name);
        Ok(Some(self.commit(next)))
    }

    fn commit(&mut self, next: LibraryData) -> Arc<LibraryData> {
        self.current = Arc::new(next);
        Arc::clone(&self.current)
    }
}

struct LibraryWorker {
    state: LibraryState,
    updates: Broadcaster<Arc<LibraryData>>,
}

impl LibraryWorker {
    fn update<F>(&mut self, operation: &str, op: F)
    where
        F: FnOnce(&mut LibraryState) -> Result<Option<Arc<LibraryData>>>,
    {
        match op(&mut self.state) {
            Ok(Some(data)) => {
                info!("Library {}: {} stories", operation, data.len());
                self.updates.publish(data);
            }
            Ok(None) => debug!("Library {} changed nothing", operation),
            Err(e) if e.is_rejection() => warn!("Library {}() rejected: {}", operation, e),
            Err(e) => error!("Library {}() failed: {}", operation, e),
        }
    }
}

/// Handle to a library of stories.
///
/// Like [`StoryStore`], every mutation is queued and returns at once; the new
/// set of stories arrives on [`LibraryStore::updates`].
#[derive(Clone)]
pub struct LibraryStore {
    dir: PathBuf,
    context: StoreContext,
    executor: SerialExecutor<LibraryWorker>,
    updates: Broadcaster<Arc<LibraryData>>,
}

impl LibraryStore {
    /// Open (or create) the library at `dir` with default collaborators.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        Self::open_with(dir, StoreContext::default())
    }

    /// Open (or create) the library at `dir`.
    pub fn open_with(dir: impl Into<PathBuf>, context: StoreContext) -> io::Result<Self> {
        let dir = dir.into();
        context.fs.create_dir_all(&dir)?;

        let updates = Broadcaster::new();
        let init = {
            let dir = dir.clone();
            let context = context.clone();
            let updates = updates.clone();
            move || {
                let state = LibraryState::load(dir, context);
                updates.publish(Arc::clone(state.current()));
                LibraryWorker { state, updates }
            }
        };

        let executor = SerialExecutor::spawn(format!("library:{}", dir.display()), init)?;
        debug!("Opened library {}", dir.display());

        Ok(Self {
            dir,
            context,
            executor,
            updates,
        })
    }

    pub fn updates(&self) -> Subscription<Arc<LibraryData>> {
        self.updates.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<LibraryData>> {
        self.updates.latest()
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn story_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Open the story called `name`, creating its directory if needed.
    ///
    /// A newly created directory is picked up by a queued refresh.
    pub fn open_story(&self, name: &str) -> io::Result<StoryStore> {
        self.context
            .config
            .validate_name(name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let path = self.story_path(name);
        let existed = self.context.fs.is_dir(&path);
        let story = StoryStore::open_with(path, self.context.clone())?;
        if !existed {
            self.refresh();
        }
        Ok(story)
    }

    pub fn create(&self, name: impl Into<String>) {
        let name = name.into();
        self.executor
            .submit(move |w| w.update("create", |s| s.create(&name)));
    }

    pub fn rename(&self, old: impl Into<String>, new: impl Into<String>) {
        let old = old.into();
        let new = new.into();
        self.executor
            .submit(move |w| w.update("rename", |s| s.rename(&old, &new)));
    }

    /// Delete a story directory and everything in it.
    pub fn delete(&self, name: impl Into<String>) {
        let name = name.into();
        self.executor
            .submit(move |w| w.update("delete", |s| s.delete(&name)));
    }

    /// Re-list the library directory.
    pub fn refresh(&self) {
        self.executor
            .submit(|w| w.update("refresh", LibraryState::refresh));
    }

    /// Wait until every operation queued so far has been applied.
    pub async fn flush(&self) {
        self.executor.flush().await;
    }
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LibraryState) {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("alpha")).unwrap();
        fs::create_dir(temp.path().join(".cache")).unwrap();
        let state = LibraryState::load(temp.path().to_path_buf(), StoreContext::default());
        (temp, state)
    }

    fn names(data: &LibraryData) -> Vec<&str> {
        data.iter().collect()
    }

    #[test]
    fn test_load_ignores_hidden() {
        let (_temp, state) = setup();
        assert_eq!(names(state.current()), vec!["alpha"]);
    }

    #[test]
    fn test_create() {
        let (temp, mut state) = setup();

        let data = state.create("beta").unwrap().unwrap();
        assert_eq!(names(&data), vec!["alpha", "beta"]);
        assert!(temp.path().join("beta").is_dir());

        let err = state.create("beta").unwrap_err();
        assert!(matches!(err, StoreError::Rejected(Rejected::StoryExists(_))));
        assert!(state.create("../escape").unwrap_err().is_rejection());
        assert!(state.create(".hidden").unwrap_err().is_rejection());
    }

    #[test]
    fn test_create_over_untracked_file_is_rejected() {
        let (temp, mut state) = setup();
        fs::write(temp.path().join("notes"), b"").unwrap();

        assert!(state.create("notes").unwrap_err().is_rejection());
        assert_eq!(state.current().len(), 1);
    }

    #[test]
    fn test_rename_guards() {
        let (temp, mut state) = setup();
        fs::create_dir(temp.path().join("gamma")).unwrap();

        // Not in the snapshot yet.
        assert!(matches!(
            state.rename("gamma", "delta").unwrap_err(),
            StoreError::Rejected(Rejected::UnknownStory(_))
        ));
        state.refresh().unwrap();

        assert!(matches!(
            state.rename("alpha", "gamma").unwrap_err(),
            StoreError::Rejected(Rejected::StoryExists(_))
        ));

        let data = state.rename("alpha", "omega").unwrap().unwrap();
        assert_eq!(names(&data), vec!["gamma", "omega"]);
        assert!(!temp.path().join("alpha").exists());
        assert!(temp.path().join("omega").is_dir());
    }

    #[test]
    fn test_rename_of_vanished_directory_is_rejected() {
        let (temp, mut state) = setup();
        fs::remove_dir(temp.path().join("alpha")).unwrap();

        assert!(state.rename("alpha", "beta").unwrap_err().is_rejection());
        assert!(!temp.path().join("beta").exists());
    }

    #[test]
    fn test_delete() {
        let (temp, mut state) = setup();
        fs::write(temp.path().join("alpha").join("story.json"), b"{}").unwrap();

        let data = state.delete("alpha").unwrap().unwrap();
        assert!(data.is_empty());
        assert!(!temp.path().join("alpha").exists());

        assert!(state.delete("alpha").unwrap_err().is_rejection());
    }

    #[test]
    fn test_refresh_replaces_set() {
        let (temp, mut state) = setup();
        assert_eq!(state.refresh().unwrap(), None);

        fs::create_dir(temp.path().join("beta")).unwrap();
        fs::remove_dir(temp.path().join("alpha")).unwrap();
        let data = state.refresh().unwrap().unwrap();
        assert_eq!(names(&data), vec!["beta"]);
    }

    #[tokio::test]
    async fn test_open_story_registers_new_directory() {
        let temp = TempDir::new().unwrap();
        let library = LibraryStore::open(temp.path().join("lib")).unwrap();

        let story = library.open_story("bedtime").unwrap();
        library.flush().await;

        assert_eq!(story.directory(), library.story_path("bedtime"));
        assert!(library.latest().unwrap().contains("bedtime"));
        assert!(library.open_story("a/b").is_err());
    }
}
