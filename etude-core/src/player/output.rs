//! Audio trigger boundary.
//!
//! The engine never waits on audio: it fires note on/off side effects into
//! an [`AudioOut`] and moves on. Keeping this a trait lets the engine run
//! against a real MIDI port, a silent stub, or a recording double in tests.

use etude_types::pitch_name;

pub trait AudioOut: Send {
    fn note_on(&mut self, channel: u8, pitch: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, pitch: u8);
    /// Release every sounding voice at once, used on shutdown and when the
    /// engine loses track of what is sounding (device reconnect).
    fn all_notes_off(&mut self);
}

/// Trigger sink that only logs, for running without any MIDI output.
#[derive(Debug, Default)]
pub struct NullOut;

impl AudioOut for NullOut {
    fn note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        log::trace!(
            target: "player",
            "note_on ch{} {} vel {}",
            channel,
            pitch_name(pitch),
            velocity
        );
    }

    fn note_off(&mut self, channel: u8, pitch: u8) {
        log::trace!(target: "player", "note_off ch{} {}", channel, pitch_name(pitch));
    }

    fn all_notes_off(&mut self) {
        log::trace!(target: "player", "all_notes_off");
    }
}

/// Recording double shared by the engine tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct TestOut {
    pub ons: Vec<(u8, u8, u8)>,
    pub offs: Vec<(u8, u8)>,
}

#[cfg(test)]
impl AudioOut for TestOut {
    fn note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.ons.push((channel, pitch, velocity));
    }

    fn note_off(&mut self, channel: u8, pitch: u8) {
        self.offs.push((channel, pitch));
    }

    fn all_notes_off(&mut self) {}
}
