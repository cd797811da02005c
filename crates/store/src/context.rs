//! Collaborators shared by every store opened from the same place.
use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::fs::{FileSystem, OsFileSystem};

/// Configuration plus the filesystem and clock a store works against.
#[derive(Clone)]
pub struct StoreContext {
    pub config: Arc<StoreConfig>,
    pub fs: Arc<dyn FileSystem>,
    pub clock: Arc<dyn Clock>,
}

impl StoreContext {
    /// Real filesystem and wall clock with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
            fs: Arc::new(OsFileSystem),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the filesystem implementation
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Set the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
