//! Persistent, serialized, observable stores for recorded stories.
//!
//! A story is a directory of audio clips plus a `story.json` manifest that
//! remembers the order of its tracks. A library is a directory of stories.
//! [`StoryStore`] and [`LibraryStore`] are cheap cloneable handles: every
//! mutation is queued on the store's own worker thread and returns at once,
//! and results are published as immutable snapshots to every subscriber.
//!
//! Modules are organized by responsibility:
//! - [`executor`] and [`broadcast`] are the concurrency primitives
//! - [`manifest`], [`scanner`] and [`manifest_store`] hold story state and
//!   its persistence
//! - [`story`] and [`library`] are the public store façades
//! - [`media`], [`recording`] and [`player`] drive audio backends
//! - [`config`], [`clock`], [`fs`] and [`context`] are the injectable
//!   collaborators
pub mod broadcast;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod fs;
pub mod library;
pub mod manifest;
pub mod manifest_store;
pub mod media;
pub mod player;
pub mod recording;
pub mod scanner;
pub mod story;

pub use broadcast::{Broadcaster, Subscription};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{CorruptManifestPolicy, StoreConfig};
pub use context::StoreContext;
pub use error::{Rejected, Result, StoreError};
pub use executor::{SerialExecutor, assert_blocking_context};
pub use fs::{DirEntry, FileSystem, OsFileSystem};
pub use library::{LibraryData, LibraryStore};
pub use manifest::Manifest;
pub use manifest_store::ManifestStore;
pub use media::{MediaCapture, MediaPlayback, PlaybackEvent};
pub use player::{COUNTDOWN_SECONDS, PlayerEvent, StoryPlayer};
pub use recording::RecordingSession;
pub use story::StoryStore;
