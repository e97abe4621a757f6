//! Playback-related types shared across crates.

use crate::TrackId;

/// A wait-mode note whose window closed without a matching key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissedNote {
    pub pitch: u8,
    pub track: TrackId,
    pub start: f64,
}

/// Feedback messages from the engine thread to the main thread.
///
/// The engine is the authority on everything reported here; handles update
/// their read state from these messages rather than assuming a command took
/// effect.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerFeedback {
    /// Clock position in seconds, published on every effective tick.
    Position(f64),
    PlayingChanged(bool),
    SpeedChanged(f64),
    WaitModeChanged(bool),
    /// Edge signal: wait mode started (true) or stopped (false) gating time.
    Waiting(bool),
    NoteMissed(MissedNote),
    /// The clock wrapped, to a loop start or to the top of the song.
    Looped(f64),
}
