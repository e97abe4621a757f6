//! Song data model: immutable after load, shared between the engine thread
//! and front-end renderers as `Arc<Song>`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TrackId;

/// One note of the song. Times are in seconds of musical time.
///
/// Identity for matching purposes is (pitch, start, track): two notes that
/// share a pitch and time window but sit on different tracks are distinct
/// and must be satisfied independently in wait mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub velocity: u8,
    pub track: TrackId,
    pub channel: u8,
}

impl Note {
    /// Time at which this note stops sounding.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub channel: u8,
    pub notes: Vec<Note>,
}

impl Track {
    /// Insert a note keeping the track sorted by start time.
    pub fn add_note(&mut self, pitch: u8, start: f64, duration: f64, velocity: u8) {
        let insert_pos = self.notes.partition_point(|n| n.start < start);
        self.notes.insert(
            insert_pos,
            Note {
                pitch,
                start,
                duration,
                velocity,
                track: self.id,
                channel: self.channel,
            },
        );
    }
}

/// Per-track playback switches, mutable between ticks.
///
/// `enabled` includes the track in the note index, visibility queries and
/// wait tracking; `play_audio` additionally lets its notes trigger audio.
/// A track with `enabled` and not `play_audio` is rendered silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    pub enabled: bool,
    pub play_audio: bool,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            play_audio: true,
        }
    }
}

/// Side map of per-track settings keyed by track id.
/// Tracks absent from the map use `TrackSettings::default()`.
pub type TrackMap = HashMap<TrackId, TrackSettings>;

pub fn track_enabled(tracks: &TrackMap, id: TrackId) -> bool {
    tracks.get(&id).map_or(true, |s| s.enabled)
}

pub fn track_audible(tracks: &TrackMap, id: TrackId) -> bool {
    tracks
        .get(&id)
        .map_or(true, |s| s.enabled && s.play_audio)
}

/// A loop region, half-open `[start, end)` in seconds, derived from measure
/// numbers against a specific song.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSpan {
    pub start_measure: usize,
    pub end_measure: usize,
    pub start: f64,
    pub end: f64,
}

/// A parsed song. Produced once per load by a file-parsing collaborator (or
/// built programmatically); never mutated during playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub tracks: Vec<Track>,
    /// Total length in seconds.
    pub duration: f64,
    /// Start time of each measure, ascending. Measure 0 starts at 0.0.
    pub measures: Vec<f64>,
}

impl Song {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracks: Vec::new(),
            duration: 0.0,
            measures: Vec::new(),
        }
    }

    /// Append a track, allocating the next track id.
    pub fn add_track(&mut self, name: &str, channel: u8) -> TrackId {
        let id = TrackId::new(self.tracks.len() as u32);
        self.tracks.push(Track {
            id,
            name: name.to_string(),
            channel,
            notes: Vec::new(),
        });
        id
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Set `duration` to the end of the latest note.
    pub fn recompute_duration(&mut self) {
        self.duration = self
            .tracks
            .iter()
            .flat_map(|t| t.notes.iter())
            .map(Note::end)
            .fold(0.0, f64::max);
    }

    /// Fill `measures` with evenly spaced measure starts covering the song.
    pub fn set_uniform_measures(&mut self, measure_len: f64) {
        self.measures.clear();
        if measure_len <= 0.0 {
            return;
        }
        let mut t = 0.0;
        while t < self.duration || self.measures.is_empty() {
            self.measures.push(t);
            t += measure_len;
        }
    }

    pub fn measure_start(&self, measure: usize) -> Option<f64> {
        self.measures.get(measure).copied()
    }

    /// Resolve a half-open measure range `[start_measure, end_measure)` into
    /// a time span. `end_measure` past the last measure means end-of-song.
    /// Returns None for an empty or inverted range.
    pub fn loop_span(&self, start_measure: usize, end_measure: usize) -> Option<LoopSpan> {
        if start_measure >= end_measure {
            return None;
        }
        let start = self.measure_start(start_measure)?;
        let end = self
            .measure_start(end_measure)
            .unwrap_or(self.duration)
            .min(self.duration);
        if end <= start {
            return None;
        }
        Some(LoopSpan {
            start_measure,
            end_measure,
            start,
            end,
        })
    }
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Human-readable pitch name, middle C (60) = "C4".
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_measure_song() -> Song {
        let mut song = Song::new("test");
        let melody = song.add_track("melody", 0);
        let track = song.track_mut(melody).unwrap();
        track.add_note(60, 0.0, 0.5, 100);
        track.add_note(64, 1.0, 0.5, 100);
        track.add_note(67, 3.0, 1.0, 100);
        song.recompute_duration();
        song.set_uniform_measures(2.0);
        song
    }

    #[test]
    fn add_note_keeps_tracks_sorted() {
        let mut song = Song::new("sort");
        let id = song.add_track("t", 0);
        let track = song.track_mut(id).unwrap();
        track.add_note(60, 1.0, 0.5, 100);
        track.add_note(62, 0.0, 0.5, 100);
        track.add_note(64, 0.5, 0.5, 100);
        let starts: Vec<f64> = track.notes.iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn recompute_duration_uses_latest_note_end() {
        let song = two_measure_song();
        assert!((song.duration - 4.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_measures_cover_the_song() {
        let song = two_measure_song();
        assert_eq!(song.measures, vec![0.0, 2.0]);
        assert_eq!(song.measure_start(1), Some(2.0));
        assert_eq!(song.measure_start(2), None);
    }

    #[test]
    fn loop_span_resolves_measures_to_times() {
        let song = two_measure_song();
        let span = song.loop_span(1, 2).unwrap();
        assert!((span.start - 2.0).abs() < 1e-9);
        assert!((span.end - 4.0).abs() < 1e-9);
    }

    #[test]
    fn loop_span_past_last_measure_ends_at_song_end() {
        let song = two_measure_song();
        let span = song.loop_span(0, 99).unwrap();
        assert!((span.end - song.duration).abs() < 1e-9);
    }

    #[test]
    fn loop_span_rejects_empty_and_inverted_ranges() {
        let song = two_measure_song();
        assert!(song.loop_span(1, 1).is_none());
        assert!(song.loop_span(2, 1).is_none());
        assert!(song.loop_span(99, 100).is_none());
    }

    #[test]
    fn track_settings_default_to_enabled_and_audible() {
        let tracks = TrackMap::new();
        assert!(track_enabled(&tracks, TrackId::new(0)));
        assert!(track_audible(&tracks, TrackId::new(0)));
    }

    #[test]
    fn render_only_track_is_enabled_but_not_audible() {
        let mut tracks = TrackMap::new();
        tracks.insert(
            TrackId::new(1),
            TrackSettings {
                enabled: true,
                play_audio: false,
            },
        );
        assert!(track_enabled(&tracks, TrackId::new(1)));
        assert!(!track_audible(&tracks, TrackId::new(1)));
    }

    #[test]
    fn disabled_track_is_not_audible_even_with_play_audio() {
        let mut tracks = TrackMap::new();
        tracks.insert(
            TrackId::new(1),
            TrackSettings {
                enabled: false,
                play_audio: true,
            },
        );
        assert!(!track_enabled(&tracks, TrackId::new(1)));
        assert!(!track_audible(&tracks, TrackId::new(1)));
    }

    #[test]
    fn pitch_names_follow_midi_convention() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(69), "A4");
        assert_eq!(pitch_name(61), "C#4");
        assert_eq!(pitch_name(0), "C-1");
        assert_eq!(pitch_name(127), "G9");
    }
}
