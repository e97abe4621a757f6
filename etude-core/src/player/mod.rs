//! Playback engine: clock, scheduler, wait-mode tracking and the thread
//! that runs them.

pub mod commands;
pub mod handle;
pub mod index;
pub mod output;
pub mod playback;
mod player_thread;
pub mod wait;

pub use commands::PlayerCmd;
pub use handle::PlayerHandle;
pub use index::NoteIndex;
pub use output::{AudioOut, NullOut};
pub use playback::{tick_player, PlayerState, MAX_SPEED, MIN_SPEED, SEEK_THRESHOLD};
pub use wait::WaitTracker;
