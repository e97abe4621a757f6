//! # etude-types
//!
//! Shared type definitions for the etude practice player.
//! The song data model and the engine feedback vocabulary live here so the
//! engine crate and any front end agree on one set of types without
//! depending on each other.

pub mod playback;
pub mod song;

pub use playback::{MissedNote, PlayerFeedback};
pub use song::{
    pitch_name, track_audible, track_enabled, LoopSpan, Note, Song, Track, TrackMap,
    TrackSettings,
};

/// Unique identifier for a song track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(u32);

impl TrackId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
