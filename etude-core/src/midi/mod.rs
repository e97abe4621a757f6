//! Hardware MIDI input.
//!
//! A practice keyboard only has to deliver key downs and ups; everything
//! else on the wire (aftertouch, pedals, pitch bend) is ignored here. The
//! driver callback parses raw messages and hands [`KeyEvent`]s over a
//! channel; the front end polls them and forwards presses to the player.

pub mod output;

use std::sync::mpsc::{self, Receiver};

use midir::{MidiInput, MidiInputConnection};

const CLIENT_NAME: &str = "etude";

/// A key moved on the connected input, any channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down { pitch: u8, velocity: u8 },
    Up { pitch: u8 },
}

/// Manages the connection to one MIDI input port.
pub struct KeyInput {
    connection: Option<MidiInputConnection<()>>,
    event_rx: Option<Receiver<KeyEvent>>,
    port_name: Option<String>,
}

impl KeyInput {
    pub fn new() -> Self {
        Self {
            connection: None,
            event_rx: None,
            port_name: None,
        }
    }

    /// Names of the input ports currently present, in connect-index order.
    pub fn list_ports() -> Vec<String> {
        let Ok(midi_in) = MidiInput::new(CLIENT_NAME) else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .map(|p| {
                midi_in
                    .port_name(p)
                    .unwrap_or_else(|_| "Unknown".to_string())
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Connect to an input port by index, replacing any existing connection.
    pub fn connect(&mut self, port_index: usize) -> Result<(), String> {
        self.disconnect();

        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| e.to_string())?;
        let ports = midi_in.ports();
        if port_index >= ports.len() {
            return Err(format!("Invalid port index: {}", port_index));
        }

        let port = &ports[port_index];
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                port,
                "etude-input",
                move |_timestamp, message, _| {
                    if let Some(event) = parse_key_event(message) {
                        let _ = tx.send(event);
                    }
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "input connected: {}", port_name);
        self.connection = Some(connection);
        self.event_rx = Some(rx);
        self.port_name = Some(port_name);
        Ok(())
    }

    /// Connect to the first port whose name contains `needle`
    /// (case-insensitive), for config-driven port selection.
    pub fn connect_named(&mut self, needle: &str) -> Result<(), String> {
        let index = Self::list_ports()
            .iter()
            .position(|name| name.to_lowercase().contains(&needle.to_lowercase()))
            .ok_or_else(|| format!("no input port matching '{}'", needle))?;
        self.connect(index)
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.event_rx = None;
        self.port_name = None;
    }

    /// Drain pending key events (non-blocking).
    pub fn poll_events(&self) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Default for KeyInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyInput {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Parse a raw MIDI message into a key event. Channel is deliberately
/// discarded: any keyboard plugged in counts as the practice keyboard.
fn parse_key_event(data: &[u8]) -> Option<KeyEvent> {
    if data.len() < 3 {
        return None;
    }
    match data[0] & 0xF0 {
        0x80 => Some(KeyEvent::Up { pitch: data[1] }),
        // Note On with velocity 0 is a release by convention
        0x90 if data[2] == 0 => Some(KeyEvent::Up { pitch: data[1] }),
        0x90 => Some(KeyEvent::Down {
            pitch: data[1],
            velocity: data[2],
        }),
        _ => None,
    }
}
