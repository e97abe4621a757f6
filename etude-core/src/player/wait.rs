//! Wait-mode satisfaction tracking.
//!
//! Satisfaction is bookkept as integer positions in the sorted note index,
//! not as time comparisons: comparing float start times against a
//! continuously moving clock makes notes flicker between seen and unseen at
//! the boundary, while set membership over a fixed array is stable no matter
//! how often a tick revisits the same instant.
//!
//! The tracker never owns the notes; callers pass the index slice into each
//! transition, and the engine resets the tracker whenever that slice is
//! rebuilt.

use std::collections::HashSet;

use etude_types::{pitch_name, MissedNote, Note};

#[derive(Debug, Default)]
pub struct WaitTracker {
    /// Notes at index `< reached` have been passed by the clock.
    /// Non-decreasing except through `reset`.
    reached: usize,
    /// Satisfied positions, always a subset of `0..reached`.
    satisfied: HashSet<usize>,
    /// Positions satisfied ahead of the clock through the grace window.
    /// Holds only indices `>= reached`; `advance_reached` promotes them
    /// into `satisfied` as the clock passes them.
    early: HashSet<usize>,
    /// Everything below this is satisfied or missed, so the blocking scan
    /// never re-examines it. Non-decreasing except through `reset`.
    scan_floor: usize,
    /// Missed notes collected by the blocking scan, drained by the engine.
    missed: Vec<MissedNote>,
    /// How far ahead of the clock a press may land, in seconds.
    grace: f64,
}

impl WaitTracker {
    pub fn new(grace: f64) -> Self {
        Self {
            grace,
            ..Self::default()
        }
    }

    pub fn reached(&self) -> usize {
        self.reached
    }

    /// Discard all satisfaction state and rebuild for a clock at `time`.
    /// Notes starting strictly before `time` are pre-satisfied, so seeking
    /// into the middle of a song never demands the past be replayed; a note
    /// starting exactly at `time` still requires a press.
    ///
    /// The only transition allowed to move `reached` backward.
    pub fn reset(&mut self, notes: &[Note], time: f64) {
        self.satisfied.clear();
        self.early.clear();
        self.missed.clear();
        self.scan_floor = 0;
        self.reached = notes.partition_point(|n| n.start <= time);
        for (i, note) in notes[..self.reached].iter().enumerate() {
            if note.start < time {
                self.satisfied.insert(i);
            }
        }
    }

    /// Move the reached cursor forward over every note with `start <= time`.
    /// Purely monotonic; called each tick before the blocking check.
    pub fn advance_reached(&mut self, notes: &[Note], time: f64) {
        while self.reached < notes.len() && notes[self.reached].start <= time {
            if self.early.remove(&self.reached) {
                self.satisfied.insert(self.reached);
            }
            self.reached += 1;
        }
    }

    /// Try to consume a key press against the song.
    ///
    /// Reached-but-unsatisfied notes win in ascending index order; failing
    /// that, the search extends into unreached notes starting within the
    /// grace window, earliest first, which lets a player strike a chord a
    /// little ahead of the beat. One press satisfies at most one note
    /// instance, so doubled pitches across tracks each demand their own
    /// press. Notes whose window already closed are missed, not candidates.
    ///
    /// Returns the satisfied index, or None if nothing matched.
    pub fn satisfy(&mut self, notes: &[Note], pitch: u8, time: f64) -> Option<usize> {
        for i in self.scan_floor..self.reached {
            let note = &notes[i];
            if note.pitch == pitch && !self.satisfied.contains(&i) && note.end() > time {
                self.satisfied.insert(i);
                log::debug!(
                    target: "player",
                    "satisfied {} (note {} at {:.3})",
                    pitch_name(pitch),
                    i,
                    note.start
                );
                return Some(i);
            }
        }
        for i in self.reached..notes.len() {
            let note = &notes[i];
            if note.start > time + self.grace {
                break;
            }
            if note.pitch == pitch && !self.early.contains(&i) {
                self.early.insert(i);
                log::debug!(
                    target: "player",
                    "satisfied {} early (note {} at {:.3})",
                    pitch_name(pitch),
                    i,
                    note.start
                );
                return Some(i);
            }
        }
        None
    }

    /// True while some reached note is unsatisfied and still sounding; the
    /// clock must not advance past the current tick while this holds.
    ///
    /// A reached note whose end has passed can never be satisfied by future
    /// input, so it is recorded as missed exactly once and released rather
    /// than blocking forever.
    pub fn has_unsatisfied_reached(&mut self, notes: &[Note], time: f64) -> bool {
        while self.scan_floor < self.reached {
            let i = self.scan_floor;
            let note = &notes[i];
            if self.satisfied.contains(&i) {
                self.scan_floor += 1;
            } else if note.end() <= time {
                log::debug!(
                    target: "player",
                    "missed {} (note {} at {:.3})",
                    pitch_name(note.pitch),
                    i,
                    note.start
                );
                self.missed.push(MissedNote {
                    pitch: note.pitch,
                    track: note.track,
                    start: note.start,
                });
                self.scan_floor += 1;
            } else {
                return true;
            }
        }
        false
    }

    /// Drain notes the blocking scan gave up on since the last call.
    pub fn take_missed(&mut self) -> Vec<MissedNote> {
        std::mem::take(&mut self.missed)
    }
}
