//! Audio device seams.
//!
//! The stores never touch audio hardware. Recording and playback are driven
//! through these traits so a platform backend (or a test fake) can be
//! plugged in.

use std::io;
use std::path::Path;

use crate::broadcast::Subscription;

/// Notifications from a [`MediaPlayback`] backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The clip is prepared and playing.
    Start,
    /// The clip played to completion.
    End,
}

/// Records audio into a file.
pub trait MediaCapture: Send {
    /// Begin recording into `path`, replacing any existing file.
    fn start(&mut self, path: &Path) -> io::Result<()>;

    /// Finish recording. Returns `false` if no usable clip was written,
    /// e.g. when stopped too soon after starting.
    fn stop(&mut self) -> bool;
}

/// Plays one audio file at a time.
pub trait MediaPlayback: Send + Sync {
    /// Stop whatever is playing and start `path`.
    fn play(&self, path: &Path) -> io::Result<()>;

    fn stop(&self);

    fn is_playing(&self) -> bool;

    /// Subscribe to start and completion events.
    fn events(&self) -> Subscription<PlaybackEvent>;
}
