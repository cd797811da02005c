//! Capturing new clips into a story's WIP slot.

use std::io;

use tracing::{debug, warn};

use crate::media::MediaCapture;
use crate::story::StoryStore;

/// Drives a [`MediaCapture`] backend for one story.
///
/// Every take is written to the story's WIP recording path. A take is then
/// either saved as a named track or discarded.
pub struct RecordingSession<C> {
    story: StoryStore,
    capture: C,
    recording: bool,
}

impl<C: MediaCapture> RecordingSession<C> {
    pub fn new(story: StoryStore, capture: C) -> Self {
        Self {
            story,
            capture,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn story(&self) -> &StoryStore {
        &self.story
    }

    /// Start a new take. Does nothing if one is already in progress.
    pub fn start(&mut self) -> io::Result<()> {
        if self.recording {
            warn!("Recording already in progress for {}", self.story.name());
            return Ok(());
        }
        let path = self.story.wip_recording_path();
        self.capture.start(&path)?;
        self.recording = true;
        debug!("Recording into {}", path.display());
        Ok(())
    }

    /// Finish the take. Returns whether a usable clip was captured.
    ///
    /// An unusable clip is discarded straight away.
    pub fn stop(&mut self) -> bool {
        if !self.recording {
            return false;
        }
        self.recording = false;

        let captured = self.capture.stop();
        if !captured {
            warn!("Recording for {} failed; discarding it", self.story.name());
            self.story.discard_wip_recording();
        }
        captured
    }

    /// Keep the last take as track `name`.
    pub fn save(&mut self, name: impl Into<String>) {
        self.story.save_wip_recording(name);
    }

    /// Throw the last take away.
    pub fn discard(&mut self) {
        self.story.discard_wip_recording();
    }

    pub fn into_inner(self) -> C {
        self.capture
    }
}
