//! Sorted note index and windowed visibility queries.
//!
//! The index flattens a song's per-track note lists into one array sorted by
//! start time. Every other engine component works in positions of this
//! array: the wait tracker and the schedule cursor are integer indices into
//! it, so satisfaction and scheduling stay free of float-boundary ambiguity
//! no matter how often the clock revisits an instant.

use etude_types::{track_enabled, Note, Song, TrackMap};

/// Built once per song load, rebuilt when the enabled-track set changes.
/// Read-only after construction: no note is removed or reordered within it.
#[derive(Debug, Clone, Default)]
pub struct NoteIndex {
    notes: Vec<Note>,
    max_duration: f64,
}

impl NoteIndex {
    /// Flatten the notes of enabled tracks, sorted ascending by start time.
    /// Ties keep input order (simultaneous notes are consumed as a set, not
    /// a sequence). The song itself is not touched.
    pub fn build(song: &Song, tracks: &TrackMap) -> Self {
        let mut notes: Vec<Note> = Vec::with_capacity(song.note_count());
        for track in &song.tracks {
            if !track_enabled(tracks, track.id) {
                continue;
            }
            notes.extend(track.notes.iter().copied());
        }
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        let max_duration = notes.iter().map(|n| n.duration).fold(0.0, f64::max);
        Self {
            notes,
            max_duration,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    /// First index whose note starts at or after `time`. Used to reposition
    /// the schedule cursor on seek/loop/stop.
    pub fn position(&self, time: f64) -> usize {
        self.notes.partition_point(|n| n.start < time)
    }

    /// Notes whose interval intersects `[time, time + lookahead]` and whose
    /// track is enabled in `tracks`.
    ///
    /// Binary-searches for the earliest note that could still be sounding
    /// (`start >= time - max_duration`), then scans forward until starts
    /// exceed the window. O(log n + k); the caller runs this once per
    /// rendered frame.
    pub fn visible(&self, time: f64, lookahead: f64, tracks: &TrackMap) -> Vec<Note> {
        if self.notes.is_empty() {
            return Vec::new();
        }
        let floor = time - self.max_duration;
        let from = self.notes.partition_point(|n| n.start < floor);
        let mut out = Vec::new();
        for note in &self.notes[from..] {
            if note.start > time + lookahead {
                break;
            }
            if note.end() >= time && track_enabled(tracks, note.track) {
                out.push(*note);
            }
        }
        out
    }

    /// Notes sounding exactly at `time`: the visibility query restricted to
    /// zero lookahead.
    pub fn active_at(&self, time: f64, tracks: &TrackMap) -> Vec<Note> {
        self.visible(time, 0.0, tracks)
    }
}
