//! Error types raised inside store workers.
//!
//! None of these reach callers of [`StoryStore`](crate::StoryStore) or
//! [`LibraryStore`](crate::LibraryStore): the worker logs them at the store
//! boundary and keeps its previous snapshot. They exist so the lower layers
//! can use `?` and so tests can assert on the exact rejection.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the manifest and library state transitions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rejected: {0}")]
    Rejected(#[from] Rejected),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a precondition rejection (logged as a warning).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Precondition violations: the operation is a complete no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("position {position} out of range [0, {len})")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("unknown track \"{0}\"")]
    UnknownTrack(String),

    #[error("track \"{0}\" already exists")]
    TrackExists(String),

    #[error("source file {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("unknown story \"{0}\"")]
    UnknownStory(String),

    #[error("story \"{0}\" already exists")]
    StoryExists(String),

    #[error("invalid name \"{0}\"")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
