//! The per-story manifest and its pure state transitions.
//!
//! A [`Manifest`] is never mutated in place. Each transition borrows the
//! current value and returns the next one, or `None` when nothing would
//! change, so snapshots handed to subscribers stay valid forever.

use serde::{Deserialize, Serialize};

use crate::clock::{Timestamp, iso_seconds};
use crate::error::Rejected;

/// Ordered track list plus creation and update times for one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(with = "iso_seconds")]
    pub created: Timestamp,
    #[serde(with = "iso_seconds")]
    pub updated: Timestamp,
    pub tracks: Vec<String>,
}

impl Manifest {
    /// A fresh manifest with no tracks.
    pub fn empty(now: Timestamp) -> Self {
        Self {
            created: now,
            updated: now,
            tracks: Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tracks.iter().any(|t| t == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t == name)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Same creation time, new track list stamped `now`.
    pub fn with_tracks(&self, tracks: Vec<String>, now: Timestamp) -> Self {
        Self {
            created: self.created,
            updated: now,
            tracks,
        }
    }

    /// Move `name` so that it ends up at `position`.
    ///
    /// The track is removed and re-inserted at `position` of the shortened
    /// list. Returns `Ok(None)` if it is already there.
    pub fn with_moved(
        &self,
        name: &str,
        position: usize,
        now: Timestamp,
    ) -> Result<Option<Self>, Rejected> {
        if position >= self.tracks.len() {
            return Err(Rejected::PositionOutOfRange {
                position,
                len: self.tracks.len(),
            });
        }
        let original = self
            .position(name)
            .ok_or_else(|| Rejected::UnknownTrack(name.to_string()))?;
        if original == position {
            return Ok(None);
        }

        let mut tracks = self.tracks.clone();
        let track = tracks.remove(original);
        tracks.insert(position, track);
        Ok(Some(self.with_tracks(tracks, now)))
    }

    /// Append a new track.
    pub fn with_added(&self, name: &str, now: Timestamp) -> Result<Self, Rejected> {
        if self.contains(name) {
            return Err(Rejected::TrackExists(name.to_string()));
        }
        let mut tracks = self.tracks.clone();
        tracks.push(name.to_string());
        Ok(self.with_tracks(tracks, now))
    }

    /// Remove an existing track.
    pub fn without(&self, name: &str, now: Timestamp) -> Result<Self, Rejected> {
        if !self.contains(name) {
            return Err(Rejected::UnknownTrack(name.to_string()));
        }
        let tracks = self.tracks.iter().filter(|t| *t != name).cloned().collect();
        Ok(self.with_tracks(tracks, now))
    }
}
