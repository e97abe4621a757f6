//! Playback clock and note scheduler.
//!
//! [`PlayerState`] owns everything a play session touches: the loaded song,
//! its sorted index, the transport flags, the wait tracker and the sounding
//! voices. All mutation goes through named transitions so each one's
//! invariants stay locally checkable; [`tick_player`] is the only place
//! time moves.

use std::sync::Arc;

use etude_types::{track_audible, LoopSpan, Note, PlayerFeedback, Song, TrackId, TrackMap};

use crate::player::index::NoteIndex;
use crate::player::output::AudioOut;
use crate::player::wait::WaitTracker;

/// Default boundary between clock jitter and a commanded seek, in seconds.
/// Configurable per state via [`PlayerState::new`].
pub const SEEK_THRESHOLD: f64 = 0.05;

/// Position feedback granularity in seconds of musical time.
const POSITION_INTERVAL: f64 = 0.02;

pub const MIN_SPEED: f64 = 0.05;
pub const MAX_SPEED: f64 = 4.0;

/// A sounding voice awaiting its note-off.
#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    pitch: u8,
    channel: u8,
    track: TrackId,
    off_at: f64,
}

pub struct PlayerState {
    song: Option<Arc<Song>>,
    index: NoteIndex,
    tracks: TrackMap,
    /// Musical time in seconds. Commands may write it directly; the tick
    /// reconciles against `last_time`.
    time: f64,
    /// The value the last tick published. Seek detection compares `time`
    /// against this.
    last_time: f64,
    last_published: f64,
    playing: bool,
    speed: f64,
    /// Jumps of `time` beyond this read as seeks; smaller ones as jitter.
    seek_threshold: f64,
    wait_mode: bool,
    waiting: bool,
    loop_span: Option<LoopSpan>,
    /// High-water mark into the index for audio triggering. Forward-only
    /// within a play session; snaps reposition it by binary search.
    schedule_cursor: usize,
    tracker: WaitTracker,
    active: Vec<ActiveNote>,
}

impl PlayerState {
    pub fn new(grace: f64, speed: f64, seek_threshold: f64) -> Self {
        Self {
            song: None,
            index: NoteIndex::default(),
            tracks: TrackMap::new(),
            time: 0.0,
            last_time: 0.0,
            last_published: 0.0,
            playing: false,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            seek_threshold,
            wait_mode: false,
            waiting: false,
            loop_span: None,
            schedule_cursor: 0,
            tracker: WaitTracker::new(grace),
            active: Vec::new(),
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn wait_mode(&self) -> bool {
        self.wait_mode
    }

    pub fn waiting(&self) -> bool {
        self.waiting
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Install a song and rewind to the top, paused. Track settings and any
    /// loop region belong to the previous song and are discarded.
    pub fn load_song(&mut self, song: Arc<Song>, out: &mut dyn AudioOut) {
        self.flush_active(out);
        self.song = Some(song);
        self.tracks.clear();
        self.loop_span = None;
        self.playing = false;
        self.time = 0.0;
        self.rebuild_index();
    }

    pub fn clear_song(&mut self, out: &mut dyn AudioOut) {
        self.flush_active(out);
        self.song = None;
        self.playing = false;
        self.loop_span = None;
        self.time = 0.0;
        self.rebuild_index();
    }

    /// Returns the effective playing flag: playing with no song loaded is
    /// refused rather than erroring.
    pub fn set_playing(&mut self, on: bool, out: &mut dyn AudioOut) -> bool {
        if on && self.song.is_none() {
            log::debug!(target: "player", "play ignored: no song loaded");
            return self.playing;
        }
        if !on {
            self.flush_active(out);
        }
        self.playing = on;
        self.playing
    }

    pub fn stop(&mut self, out: &mut dyn AudioOut) {
        self.playing = false;
        self.snap_to(0.0, out);
    }

    /// Record a seek target. The next tick notices the jump against the
    /// published clock and snaps, so scheduling state is never patched here.
    pub fn seek(&mut self, time: f64) {
        let duration = self.song.as_ref().map(|s| s.duration).unwrap_or(0.0);
        self.time = time.clamp(0.0, duration);
    }

    pub fn set_speed(&mut self, speed: f64) -> f64 {
        let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
        if clamped != speed {
            log::warn!(target: "player", "speed {} clamped to {}", speed, clamped);
        }
        self.speed = clamped;
        self.speed
    }

    /// Entering wait mode owes only what lies ahead of the current time.
    pub fn set_wait_mode(&mut self, on: bool) {
        if self.wait_mode == on {
            return;
        }
        self.wait_mode = on;
        if on {
            self.tracker.reset(self.index.notes(), self.time);
        }
    }

    pub fn set_loop(&mut self, span: LoopSpan) {
        self.loop_span = Some(span);
    }

    pub fn clear_loop(&mut self) {
        self.loop_span = None;
    }

    /// The index only holds enabled tracks, so membership changes rebuild
    /// it; the cursor and tracker are rebound to the current time.
    pub fn set_track_enabled(&mut self, track: TrackId, enabled: bool, out: &mut dyn AudioOut) {
        self.tracks.entry(track).or_default().enabled = enabled;
        if !enabled {
            self.release_track(track, out);
        }
        self.rebuild_index();
    }

    /// Muting audio is a per-tick map lookup; the index is untouched.
    pub fn set_track_audio(&mut self, track: TrackId, play_audio: bool, out: &mut dyn AudioOut) {
        self.tracks.entry(track).or_default().play_audio = play_audio;
        if !play_audio {
            self.release_track(track, out);
        }
    }

    /// Feed a key press into wait-mode matching. Presses while paused do
    /// not correspond to any performance moment and are ignored.
    pub fn key_down(&mut self, pitch: u8) -> Option<usize> {
        if !(self.playing && self.wait_mode) {
            return None;
        }
        self.tracker.satisfy(self.index.notes(), pitch, self.time)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn rebuild_index(&mut self) {
        self.index = match &self.song {
            Some(song) => NoteIndex::build(song, &self.tracks),
            None => NoteIndex::default(),
        };
        self.schedule_cursor = self.index.position(self.time);
        self.tracker.reset(self.index.notes(), self.time);
        self.last_time = self.time;
    }

    /// Land the clock exactly on `time`: silence in-flight voices,
    /// reposition the schedule cursor by binary search and rebuild
    /// satisfaction state. Notes that started before `time` and are still
    /// sounding do not retrigger.
    fn snap_to(&mut self, time: f64, out: &mut dyn AudioOut) {
        self.flush_active(out);
        self.time = time;
        self.last_time = time;
        self.schedule_cursor = self.index.position(time);
        self.tracker.reset(self.index.notes(), time);
    }

    fn publish_position(&mut self, feedback: &mut Vec<PlayerFeedback>) {
        self.last_published = self.time;
        feedback.push(PlayerFeedback::Position(self.time));
    }

    fn flush_active(&mut self, out: &mut dyn AudioOut) {
        for voice in self.active.drain(..) {
            out.note_off(voice.channel, voice.pitch);
        }
    }

    fn release_ended(&mut self, time: f64, out: &mut dyn AudioOut) {
        self.active.retain(|voice| {
            if voice.off_at <= time {
                out.note_off(voice.channel, voice.pitch);
                false
            } else {
                true
            }
        });
    }

    fn release_track(&mut self, track: TrackId, out: &mut dyn AudioOut) {
        self.active.retain(|voice| {
            if voice.track == track {
                out.note_off(voice.channel, voice.pitch);
                false
            } else {
                true
            }
        });
    }

    /// Trigger every note the clock passed this tick.
    fn run_schedule(&mut self, time: f64, out: &mut dyn AudioOut) {
        while self.schedule_cursor < self.index.len() {
            let note = self.index.notes()[self.schedule_cursor];
            if note.start > time {
                break;
            }
            self.schedule_cursor += 1;
            // Skip notes that already ended (fast-forward under the seek
            // threshold) instead of blipping them
            if note.end() > time && track_audible(&self.tracks, note.track) {
                self.start_voice(note, out);
            }
        }
    }

    fn start_voice(&mut self, note: Note, out: &mut dyn AudioOut) {
        // Retriggering a sounding (channel, pitch) pair would orphan its off
        if let Some(pos) = self
            .active
            .iter()
            .position(|v| v.channel == note.channel && v.pitch == note.pitch)
        {
            let voice = self.active.swap_remove(pos);
            out.note_off(voice.channel, voice.pitch);
        }
        out.note_on(note.channel, note.pitch, note.velocity);
        self.active.push(ActiveNote {
            pitch: note.pitch,
            channel: note.channel,
            track: note.track,
            off_at: note.end(),
        });
    }
}

/// Advance the clock by one tick of `wall_delta` wall seconds.
///
/// Order within a tick: reconcile external seeks, integrate the scaled
/// delta, wrap across loop or song end, consult the wait tracker, release
/// ended voices, trigger newly passed notes, publish. In wait mode with an
/// unsatisfied reached note still sounding, time holds at its previous
/// value and nothing is scheduled.
pub fn tick_player(
    state: &mut PlayerState,
    wall_delta: f64,
    out: &mut dyn AudioOut,
    feedback: &mut Vec<PlayerFeedback>,
) {
    let Some(duration) = state.song.as_ref().map(|s| s.duration) else {
        // No song while playing: pause rather than error
        if state.playing {
            state.playing = false;
            feedback.push(PlayerFeedback::PlayingChanged(false));
        }
        if state.waiting {
            state.waiting = false;
            feedback.push(PlayerFeedback::Waiting(false));
        }
        return;
    };

    // A command rewrote `time` behind the clock's back: snap instead of
    // gradually correcting, so nothing double-triggers.
    if (state.time - state.last_time).abs() > state.seek_threshold {
        let target = state.time;
        state.snap_to(target, out);
        state.publish_position(feedback);
    }

    let mut blocked = false;
    if state.playing {
        let mut new_time = state.time + wall_delta * state.speed;

        // Wraparound lands exactly on the wrap target, never past it
        let wrap_target = match state.loop_span {
            Some(span) if new_time >= span.end => Some(span.start),
            None if duration > 0.0 && new_time >= duration => Some(0.0),
            _ => None,
        };
        if let Some(target) = wrap_target {
            state.snap_to(target, out);
            new_time = target;
            state.last_published = target;
            feedback.push(PlayerFeedback::Looped(target));
        }

        if state.wait_mode {
            state.tracker.advance_reached(state.index.notes(), new_time);
            blocked = state
                .tracker
                .has_unsatisfied_reached(state.index.notes(), new_time);
            for missed in state.tracker.take_missed() {
                feedback.push(PlayerFeedback::NoteMissed(missed));
            }
        }
        if blocked {
            // Hold the clock; a matching press lets the next tick through
            new_time = state.time;
        }

        state.release_ended(new_time, out);
        if !blocked {
            state.run_schedule(new_time, out);
        }
        state.time = new_time;
        state.last_time = new_time;
        if (new_time - state.last_published).abs() >= POSITION_INTERVAL {
            state.publish_position(feedback);
        }
    }

    if state.waiting != blocked {
        state.waiting = blocked;
        feedback.push(PlayerFeedback::Waiting(blocked));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::output::TestOut;

    /// Three notes a second apart on one track.
    fn make_fixture() -> (PlayerState, TestOut) {
        let mut song = Song::new("fixture");
        let lead = song.add_track("lead", 0);
        let track = song.track_mut(lead).unwrap();
        track.add_note(60, 0.0, 0.5, 100);
        track.add_note(64, 1.0, 0.5, 100);
        track.add_note(67, 2.0, 1.0, 100);
        song.recompute_duration();
        song.set_uniform_measures(1.0);

        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        state.load_song(Arc::new(song), &mut out);
        state.set_playing(true, &mut out);
        (state, out)
    }

    fn do_tick(state: &mut PlayerState, out: &mut TestOut, delta: f64) -> Vec<PlayerFeedback> {
        let mut feedback = Vec::new();
        tick_player(state, delta, out, &mut feedback);
        feedback
    }

    #[test]
    fn ticking_with_no_song_pauses_instead_of_erroring() {
        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        state.playing = true;
        let mut out = TestOut::default();
        let feedback = do_tick(&mut state, &mut out, 0.1);
        assert!(!state.playing);
        assert!(feedback.contains(&PlayerFeedback::PlayingChanged(false)));
    }

    #[test]
    fn time_advances_by_wall_delta_scaled_by_speed() {
        let (mut state, mut out) = make_fixture();
        state.set_speed(2.0);
        do_tick(&mut state, &mut out, 0.1);
        assert!((state.time - 0.2).abs() < 1e-9);
    }

    #[test]
    fn notes_trigger_once_and_release_at_their_end() {
        let (mut state, mut out) = make_fixture();
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons, vec![(0, 60, 100)]);
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons.len(), 1, "no retrigger while sounding");

        // Crossing the end of the note releases its voice
        do_tick(&mut state, &mut out, 0.35);
        assert_eq!(out.offs, vec![(0, 60)]);

        do_tick(&mut state, &mut out, 0.5);
        assert_eq!(out.ons, vec![(0, 60, 100), (0, 64, 100)]);
    }

    #[test]
    fn seek_snaps_and_does_not_retrigger_straddling_notes() {
        let (mut state, mut out) = make_fixture();
        do_tick(&mut state, &mut out, 0.1);
        state.seek(2.5);
        let feedback = do_tick(&mut state, &mut out, 0.01);

        // The sounding voice was flushed and nothing retriggered: the last
        // note started at 2.0, before the seek target
        assert_eq!(out.offs, vec![(0, 60)]);
        assert_eq!(out.ons.len(), 1);
        assert!(feedback
            .iter()
            .any(|f| matches!(f, PlayerFeedback::Position(p) if (p - 2.5).abs() < 1e-9)));
    }

    #[test]
    fn small_clock_jitter_is_not_treated_as_a_seek() {
        let (mut state, mut out) = make_fixture();
        do_tick(&mut state, &mut out, 0.1);
        state.seek(0.11);
        let feedback = do_tick(&mut state, &mut out, 0.0);
        assert!(out.offs.is_empty(), "no flush for sub-threshold jumps");
        assert!(feedback.is_empty());
        assert_eq!(state.schedule_cursor, 1);
    }

    #[test]
    fn seek_while_paused_snaps_on_the_next_tick() {
        let (mut state, mut out) = make_fixture();
        state.set_playing(false, &mut out);
        state.seek(2.5);
        let feedback = do_tick(&mut state, &mut out, 0.1);
        assert!((state.time - 2.5).abs() < 1e-9, "paused clock does not advance");
        assert_eq!(state.schedule_cursor, 3);
        assert!(feedback
            .iter()
            .any(|f| matches!(f, PlayerFeedback::Position(p) if (p - 2.5).abs() < 1e-9)));
    }

    #[test]
    fn loop_wrap_lands_exactly_on_the_loop_start() {
        let (mut state, mut out) = make_fixture();
        let span = state.song.as_ref().unwrap().loop_span(1, 2).unwrap();
        state.set_loop(span);
        state.seek(1.5);
        do_tick(&mut state, &mut out, 0.01);

        let feedback = do_tick(&mut state, &mut out, 0.6);
        assert_eq!(state.time, 1.0, "wrap target is exact, no overshoot carry");
        assert!(feedback
            .iter()
            .any(|f| matches!(f, PlayerFeedback::Looped(p) if (p - 1.0).abs() < 1e-9)));
        // The note at the loop start triggers on the wrap tick
        assert!(out.ons.contains(&(0, 64, 100)));
    }

    #[test]
    fn loop_wrap_resets_wait_satisfaction() {
        let (mut state, mut out) = make_fixture();
        let span = state.song.as_ref().unwrap().loop_span(1, 2).unwrap();
        state.set_loop(span);
        state.set_wait_mode(true);
        state.seek(1.5);
        do_tick(&mut state, &mut out, 0.01);
        assert!(!state.waiting, "notes before the seek target are owed nothing");

        // Cross the loop end: the pass starts over and the note at the loop
        // start must be played again, prior satisfaction notwithstanding
        do_tick(&mut state, &mut out, 0.6);
        assert_eq!(state.time, 1.0);
        assert!(state.waiting);
        let before = state.time;
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(state.time, before, "frozen at the loop start");

        assert_eq!(state.key_down(64), Some(1));
        do_tick(&mut state, &mut out, 0.1);
        assert!(!state.waiting);
        assert!(state.time > 1.0);
    }

    #[test]
    fn end_of_song_wraps_to_zero() {
        let (mut state, mut out) = make_fixture();
        state.seek(2.9);
        do_tick(&mut state, &mut out, 0.01);
        let feedback = do_tick(&mut state, &mut out, 0.2);
        assert_eq!(state.time, 0.0);
        assert!(feedback
            .iter()
            .any(|f| matches!(f, PlayerFeedback::Looped(p) if p.abs() < 1e-9)));
        // Playback continues from the top
        assert!(out.ons.contains(&(0, 60, 100)));
    }

    #[test]
    fn wait_mode_freezes_time_until_the_pitch_is_struck() {
        let (mut state, mut out) = make_fixture();
        state.set_wait_mode(true);

        let feedback = do_tick(&mut state, &mut out, 0.1);
        assert!(feedback.contains(&PlayerFeedback::Waiting(true)));
        assert!(out.ons.is_empty(), "blocked ticks schedule nothing");
        let before = state.time;
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(state.time, before, "time after a blocked tick equals time before");

        assert_eq!(state.key_down(60), Some(0));
        let feedback = do_tick(&mut state, &mut out, 0.1);
        assert!(state.time > before);
        assert!(feedback.contains(&PlayerFeedback::Waiting(false)));
        // Satisfying the note lets its audio trigger through
        assert_eq!(out.ons, vec![(0, 60, 100)]);
    }

    #[test]
    fn presses_while_paused_do_not_satisfy() {
        let (mut state, mut out) = make_fixture();
        state.set_wait_mode(true);
        state.set_playing(false, &mut out);
        assert_eq!(state.key_down(60), None);

        state.set_playing(true, &mut out);
        do_tick(&mut state, &mut out, 0.1);
        assert!(state.waiting, "the paused press bought nothing");
    }

    #[test]
    fn enabling_wait_mode_mid_song_owes_only_whats_ahead() {
        let (mut state, mut out) = make_fixture();
        for _ in 0..12 {
            do_tick(&mut state, &mut out, 0.1);
        }
        assert!((state.time - 1.2).abs() < 1e-9);

        // C4 went unplayed and E4 is mid-sound; neither is demanded now
        state.set_wait_mode(true);
        for _ in 0..20 {
            do_tick(&mut state, &mut out, 0.05);
        }
        assert!(state.waiting, "frozen ahead of the next note");
        assert!(state.time < 2.0);
        assert_eq!(state.key_down(67), Some(2));
        do_tick(&mut state, &mut out, 0.05);
        assert!(!state.waiting);
    }

    #[test]
    fn note_that_expires_while_blocked_is_missed_not_required() {
        let mut song = Song::new("chord");
        let lead = song.add_track("lead", 0);
        let track = song.track_mut(lead).unwrap();
        track.add_note(60, 0.0, 2.0, 100);
        track.add_note(64, 0.1, 0.05, 100);
        song.recompute_duration();

        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        state.load_song(Arc::new(song), &mut out);
        state.set_wait_mode(true);
        state.set_playing(true, &mut out);

        do_tick(&mut state, &mut out, 0.5);
        assert!(state.waiting);
        state.key_down(60);
        let feedback = do_tick(&mut state, &mut out, 0.5);
        assert!(!state.waiting, "the expired short note no longer gates");
        assert!(feedback
            .iter()
            .any(|f| matches!(f, PlayerFeedback::NoteMissed(m) if m.pitch == 64)));
    }

    #[test]
    fn early_press_within_grace_avoids_the_freeze() {
        let (mut state, mut out) = make_fixture();
        state.set_wait_mode(true);
        state.key_down(60);
        for _ in 0..8 {
            do_tick(&mut state, &mut out, 0.1);
        }
        assert!((state.time - 0.8).abs() < 1e-9);

        // E4 starts at 1.0; 0.2 ahead is inside the grace window
        assert_eq!(state.key_down(64), Some(1));
        let mut saw_waiting = false;
        for _ in 0..4 {
            let feedback = do_tick(&mut state, &mut out, 0.1);
            saw_waiting |= feedback.contains(&PlayerFeedback::Waiting(true));
        }
        assert!(state.time > 1.0);
        assert!(!saw_waiting, "the clock sailed past the satisfied note");
    }

    #[test]
    fn disabling_a_track_releases_voices_and_rebuilds_the_index() {
        let mut song = Song::new("duo");
        let lead = song.add_track("lead", 0);
        song.track_mut(lead).unwrap().add_note(60, 0.0, 2.0, 100);
        let accomp = song.add_track("accomp", 1);
        song.track_mut(accomp).unwrap().add_note(64, 0.0, 2.0, 100);
        song.recompute_duration();

        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        state.load_song(Arc::new(song), &mut out);
        state.set_playing(true, &mut out);
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons.len(), 2);

        state.set_track_enabled(accomp, false, &mut out);
        assert_eq!(out.offs, vec![(1, 64)], "only the disabled track's voice drops");
        assert_eq!(state.index.len(), 1);

        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons.len(), 2, "nothing retriggers after the rebuild");
    }

    #[test]
    fn audio_muted_track_is_scheduled_silently() {
        let mut song = Song::new("duo");
        let lead = song.add_track("lead", 0);
        song.track_mut(lead).unwrap().add_note(60, 0.0, 1.0, 100);
        let accomp = song.add_track("accomp", 1);
        song.track_mut(accomp).unwrap().add_note(64, 0.0, 1.0, 100);
        song.recompute_duration();

        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        state.load_song(Arc::new(song), &mut out);
        state.set_track_audio(accomp, false, &mut out);
        state.set_playing(true, &mut out);
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons, vec![(0, 60, 100)]);
        // The muted track still participates in the index
        assert_eq!(state.index.len(), 2);
    }

    #[test]
    fn retriggered_pitch_evicts_the_previous_voice() {
        let mut song = Song::new("repeat");
        let lead = song.add_track("lead", 0);
        let track = song.track_mut(lead).unwrap();
        track.add_note(60, 0.0, 1.0, 100);
        track.add_note(60, 0.5, 0.5, 90);
        song.recompute_duration();

        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        state.load_song(Arc::new(song), &mut out);
        state.set_playing(true, &mut out);
        do_tick(&mut state, &mut out, 0.1);
        do_tick(&mut state, &mut out, 0.5);
        assert_eq!(out.ons, vec![(0, 60, 100), (0, 60, 90)]);
        assert_eq!(out.offs, vec![(0, 60)], "the first voice was evicted");
        assert_eq!(state.active.len(), 1);
    }

    #[test]
    fn pausing_releases_sounding_voices() {
        let (mut state, mut out) = make_fixture();
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons.len(), 1);
        state.set_playing(false, &mut out);
        assert_eq!(out.offs, vec![(0, 60)]);
    }

    #[test]
    fn stop_rewinds_and_replays_from_the_top() {
        let (mut state, mut out) = make_fixture();
        do_tick(&mut state, &mut out, 0.1);
        state.stop(&mut out);
        assert!(!state.playing);
        assert_eq!(state.time, 0.0);
        assert_eq!(state.schedule_cursor, 0);
        assert_eq!(out.offs, vec![(0, 60)]);

        state.set_playing(true, &mut out);
        do_tick(&mut state, &mut out, 0.1);
        assert_eq!(out.ons, vec![(0, 60, 100), (0, 60, 100)]);
    }

    #[test]
    fn speed_is_clamped_to_the_supported_range() {
        let (mut state, _out) = make_fixture();
        assert_eq!(state.set_speed(100.0), MAX_SPEED);
        assert_eq!(state.set_speed(0.0), MIN_SPEED);
    }

    #[test]
    fn play_with_no_song_is_refused() {
        let mut state = PlayerState::new(0.25, 1.0, SEEK_THRESHOLD);
        let mut out = TestOut::default();
        assert!(!state.set_playing(true, &mut out));
        assert!(!state.playing);
    }
}
