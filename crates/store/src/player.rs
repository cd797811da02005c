//! Tap-to-play controller for listening to a story.
//!
//! Each [`StoryPlayer::play`] plays the next track. When the last track ends
//! the player counts down for [`COUNTDOWN_SECONDS`] before rewinding to the
//! first track.
//!
//! ```text
//! Waiting --play--> Playing --End--> Waiting (next track)
//!                      |
//!                      +--End (last track)--> End{5} .. End{0} --> Waiting (track 0)
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::broadcast::{Broadcaster, Subscription};
use crate::manifest::Manifest;
use crate::media::{MediaPlayback, PlaybackEvent};
use crate::story::StoryStore;

/// Seconds shown after the last track before the player rewinds.
pub const COUNTDOWN_SECONDS: u32 = 5;

/// Player state as seen by a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Idle, ready for the next track.
    Waiting,
    Playing,
    /// The story has finished; rewinds when `countdown` reaches zero.
    End { countdown: u32 },
}

struct Inner {
    tracks: Vec<PathBuf>,
    playback: Arc<dyn MediaPlayback>,
    current: Mutex<usize>,
    events: Broadcaster<PlayerEvent>,
}

impl Inner {
    fn current(&self) -> MutexGuard<'_, usize> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Plays a fixed list of tracks one tap at a time.
///
/// Must be created inside a tokio runtime: completion events from the
/// playback backend are handled on a spawned task.
pub struct StoryPlayer {
    inner: Arc<Inner>,
    task: JoinHandle<()>,
}

impl StoryPlayer {
    pub fn new(tracks: Vec<PathBuf>, playback: Arc<dyn MediaPlayback>) -> Self {
        let mut playback_events = playback.events();
        // Skip the replayed latest event; only completions from now on count.
        while playback_events.try_recv().is_some() {}

        let events = Broadcaster::new();
        events.publish(PlayerEvent::Waiting);

        let inner = Arc::new(Inner {
            tracks,
            playback,
            current: Mutex::new(0),
            events,
        });
        let task = tokio::spawn(run(Arc::clone(&inner), playback_events));

        Self { inner, task }
    }

    /// Player for the tracks of `manifest`, resolved against `story`.
    pub fn for_story(
        story: &StoryStore,
        manifest: &Manifest,
        playback: Arc<dyn MediaPlayback>,
    ) -> Self {
        let tracks = manifest
            .tracks
            .iter()
            .map(|name| story.track_path(name))
            .collect();
        Self::new(tracks, playback)
    }

    pub fn events(&self) -> Subscription<PlayerEvent> {
        self.inner.events.subscribe()
    }

    /// Play the current track, unless something is already playing or the
    /// story has finished and not yet rewound.
    pub fn play(&self) {
        let current = *self.inner.current();
        let Some(track) = self.inner.tracks.get(current) else {
            return;
        };
        if self.inner.playback.is_playing() {
            return;
        }

        match self.inner.playback.play(track) {
            Ok(()) => {
                debug!("Playing track {} ({})", current, track.display());
                self.inner.events.publish(PlayerEvent::Playing);
            }
            Err(e) => error!("Failed to play {}: {}", track.display(), e),
        }
    }

    /// Stop playback. The current track is not advanced.
    pub fn stop(&self) {
        self.inner.playback.stop();
        self.inner.events.publish(PlayerEvent::Waiting);
    }

    /// Index of the track the next [`play`](Self::play) will start.
    pub fn current_track(&self) -> usize {
        *self.inner.current()
    }
}

impl Drop for StoryPlayer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(inner: Arc<Inner>, mut playback_events: Subscription<PlaybackEvent>) {
    while let Some(event) = playback_events.recv().await {
        if event != PlaybackEvent::End {
            continue;
        }

        let finished = {
            let mut current = inner.current();
            *current += 1;
            *current >= inner.tracks.len()
        };
        if !finished {
            inner.events.publish(PlayerEvent::Waiting);
            continue;
        }

        for countdown in (0..=COUNTDOWN_SECONDS).rev() {
            inner.events.publish(PlayerEvent::End { countdown });
            if countdown > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        *inner.current() = 0;
        inner.events.publish(PlayerEvent::Waiting);
    }
}
