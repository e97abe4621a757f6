//! Core of the etude MIDI practice player: the playback clock, the
//! note-matching engine behind wait mode, and the MIDI device plumbing
//! that feeds them.
//!
//! Front ends hold a [`PlayerHandle`], which owns the engine thread, and a
//! [`KeyInput`] for the practice keyboard. Everything timing-critical
//! happens on the engine thread; handles only exchange messages with it.

pub mod config;
pub mod midi;
pub mod player;

pub use config::Config;
pub use midi::output::MidiOut;
pub use midi::{KeyEvent, KeyInput};
pub use player::{AudioOut, NoteIndex, NullOut, PlayerCmd, PlayerHandle};
