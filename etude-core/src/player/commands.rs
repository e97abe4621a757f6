//! Commands accepted by the player engine thread.
//!
//! Everything the outside world may ask of the engine travels through one
//! of these. Time-critical commands ride a priority lane so a key press is
//! never stuck behind a song load.

use std::sync::Arc;

use etude_types::{LoopSpan, Song, TrackId};

#[derive(Debug, Clone)]
pub enum PlayerCmd {
    // ── Session ────────────────────────────────────────────────────────
    /// Install a song; the engine rewinds to the top, paused.
    LoadSong(Arc<Song>),
    ClearSong,

    // ── Transport ──────────────────────────────────────────────────────
    SetPlaying(bool),
    /// Pause and rewind to time zero.
    Stop,
    /// Jump to a time in seconds; the engine snaps on its next tick.
    Seek(f64),
    /// Playback rate multiplier, clamped by the engine.
    SetSpeed(f64),
    SetWaitMode(bool),
    SetLoop(LoopSpan),
    ClearLoop,

    // ── Tracks ─────────────────────────────────────────────────────────
    /// Include or exclude a track from playback and wait tracking.
    SetTrackEnabled(TrackId, bool),
    /// Mute or unmute a track's audio without touching its notes.
    SetTrackAudio(TrackId, bool),

    // ── Live input ─────────────────────────────────────────────────────
    /// A key went down on the connected input; feeds wait-mode matching
    /// and, when enabled, echoes to the output.
    KeyDown { pitch: u8, velocity: u8 },
    KeyUp { pitch: u8 },

    // ── Lifecycle ──────────────────────────────────────────────────────
    Shutdown,
}

impl PlayerCmd {
    /// Commands whose latency the player can hear. Key presses carry the
    /// performance itself (the grace window is a few hundred milliseconds),
    /// and transport changes should feel immediate.
    pub fn is_priority(&self) -> bool {
        matches!(
            self,
            PlayerCmd::KeyDown { .. }
                | PlayerCmd::KeyUp { .. }
                | PlayerCmd::SetPlaying(_)
                | PlayerCmd::Stop
                | PlayerCmd::Seek(_)
                | PlayerCmd::SetWaitMode(_)
                | PlayerCmd::Shutdown
        )
    }
}
