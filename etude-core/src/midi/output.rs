//! Hardware MIDI output: the player's trigger boundary realized on a
//! synth or soundfont port.

use midir::{MidiOutput, MidiOutputConnection};

use crate::player::output::AudioOut;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const CC_ALL_NOTES_OFF: u8 = 123;

pub struct MidiOut {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidiOut {
    /// Names of the output ports currently present, in connect-index order.
    pub fn list_ports() -> Vec<String> {
        let Ok(midi_out) = MidiOutput::new(super::CLIENT_NAME) else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .map(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_else(|_| "Unknown".to_string())
            })
            .collect()
    }

    pub fn connect(port_index: usize) -> Result<Self, String> {
        let midi_out = MidiOutput::new(super::CLIENT_NAME).map_err(|e| e.to_string())?;
        let ports = midi_out.ports();
        if port_index >= ports.len() {
            return Err(format!("Invalid port index: {}", port_index));
        }

        let port = &ports[port_index];
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());
        let connection = midi_out
            .connect(port, "etude-output")
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "output connected: {}", port_name);
        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Connect to the first port whose name contains `needle`
    /// (case-insensitive), for config-driven port selection.
    pub fn connect_named(needle: &str) -> Result<Self, String> {
        let index = Self::list_ports()
            .iter()
            .position(|name| name.to_lowercase().contains(&needle.to_lowercase()))
            .ok_or_else(|| format!("no output port matching '{}'", needle))?;
        Self::connect(index)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(&mut self, message: &[u8]) {
        if let Err(e) = self.connection.send(message) {
            log::warn!(target: "midi", "send failed on {}: {}", self.port_name, e);
        }
    }
}

impl AudioOut for MidiOut {
    fn note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.send(&note_on_message(channel, pitch, velocity));
    }

    fn note_off(&mut self, channel: u8, pitch: u8) {
        self.send(&note_off_message(channel, pitch));
    }

    fn all_notes_off(&mut self) {
        for channel in 0..16 {
            self.send(&[CONTROL_CHANGE | channel, CC_ALL_NOTES_OFF, 0]);
        }
    }
}

fn note_on_message(channel: u8, pitch: u8, velocity: u8) -> [u8; 3] {
    [
        NOTE_ON | (channel & 0x0F),
        pitch & 0x7F,
        velocity.min(0x7F),
    ]
}

fn note_off_message(channel: u8, pitch: u8) -> [u8; 3] {
    [NOTE_OFF | (channel & 0x0F), pitch & 0x7F, 0]
}
