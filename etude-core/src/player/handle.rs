//! Handle for driving the player from UI or CLI threads.
//!
//! The engine thread is the authority on playback state. The handle keeps a
//! cheap mirror of it, refreshed by [`PlayerHandle::drain_feedback`], plus
//! its own copy of the song and note index so renderers can run visibility
//! queries every frame without crossing a channel.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use etude_types::{LoopSpan, MissedNote, Note, PlayerFeedback, Song, TrackId, TrackMap};

use crate::config::Config;
use crate::player::commands::PlayerCmd;
use crate::player::index::NoteIndex;
use crate::player::output::{AudioOut, NullOut};
use crate::player::player_thread::PlayerThread;
use crate::player::playback::{MAX_SPEED, MIN_SPEED};

pub struct PlayerHandle {
    priority_tx: Sender<PlayerCmd>,
    normal_tx: Sender<PlayerCmd>,
    feedback_rx: mpsc::Receiver<PlayerFeedback>,
    thread: Option<JoinHandle<()>>,

    // Mirror of engine state, refreshed by drain_feedback()
    position: f64,
    playing: bool,
    speed: f64,
    wait_mode: bool,
    waiting: bool,
    missed: Vec<MissedNote>,

    // Local copies for renderer queries
    song: Option<Arc<Song>>,
    tracks: TrackMap,
    index: NoteIndex,
    loop_span: Option<LoopSpan>,
}

impl PlayerHandle {
    /// Spawn the engine thread against the given output.
    pub fn new(out: Box<dyn AudioOut>, config: &Config) -> Self {
        let (priority_tx, priority_rx) = crossbeam_channel::unbounded();
        let (normal_tx, normal_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();

        let speed = config.default_speed();
        let engine = PlayerThread::new(priority_rx, normal_rx, feedback_tx, out, config);
        let thread = thread::spawn(move || engine.run());

        Self {
            priority_tx,
            normal_tx,
            feedback_rx,
            thread: Some(thread),
            position: 0.0,
            playing: false,
            speed,
            wait_mode: false,
            waiting: false,
            missed: Vec::new(),
            song: None,
            tracks: TrackMap::new(),
            index: NoteIndex::default(),
            loop_span: None,
        }
    }

    // ── Session ────────────────────────────────────────────────────────

    pub fn load_song(&mut self, song: Song) {
        let song = Arc::new(song);
        self.song = Some(Arc::clone(&song));
        self.tracks.clear();
        self.loop_span = None;
        self.playing = false;
        self.waiting = false;
        self.position = 0.0;
        self.rebuild_index();
        self.send_cmd(PlayerCmd::LoadSong(song));
    }

    pub fn clear_song(&mut self) {
        self.song = None;
        self.tracks.clear();
        self.loop_span = None;
        self.playing = false;
        self.waiting = false;
        self.position = 0.0;
        self.rebuild_index();
        self.send_cmd(PlayerCmd::ClearSong);
    }

    // ── Transport ──────────────────────────────────────────────────────

    pub fn play(&mut self) {
        if self.song.is_none() {
            log::debug!(target: "player", "play ignored: no song loaded");
            return;
        }
        self.playing = true;
        self.send_cmd(PlayerCmd::SetPlaying(true));
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.send_cmd(PlayerCmd::SetPlaying(false));
    }

    pub fn toggle_play(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.waiting = false;
        self.position = 0.0;
        self.send_cmd(PlayerCmd::Stop);
    }

    pub fn seek(&mut self, time: f64) {
        let duration = self.song.as_ref().map(|s| s.duration).unwrap_or(0.0);
        self.position = time.clamp(0.0, duration);
        self.send_cmd(PlayerCmd::Seek(time));
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.send_cmd(PlayerCmd::SetSpeed(speed));
    }

    pub fn set_wait_mode(&mut self, on: bool) {
        self.wait_mode = on;
        self.send_cmd(PlayerCmd::SetWaitMode(on));
    }

    pub fn toggle_wait_mode(&mut self) {
        self.set_wait_mode(!self.wait_mode);
    }

    /// Loop a half-open measure range. Validated against the loaded song
    /// before anything is sent to the engine.
    pub fn set_loop_range(&mut self, start_measure: usize, end_measure: usize) -> Result<(), String> {
        let song = self.song.as_ref().ok_or("no song loaded")?;
        let span = song
            .loop_span(start_measure, end_measure)
            .ok_or_else(|| format!("invalid loop range {}..{}", start_measure, end_measure))?;
        self.loop_span = Some(span);
        self.send_cmd(PlayerCmd::SetLoop(span));
        Ok(())
    }

    pub fn clear_loop(&mut self) {
        self.loop_span = None;
        self.send_cmd(PlayerCmd::ClearLoop);
    }

    // ── Tracks ─────────────────────────────────────────────────────────

    pub fn set_track_enabled(&mut self, track: TrackId, enabled: bool) {
        self.tracks.entry(track).or_default().enabled = enabled;
        self.rebuild_index();
        self.send_cmd(PlayerCmd::SetTrackEnabled(track, enabled));
    }

    pub fn set_track_audio(&mut self, track: TrackId, play_audio: bool) {
        self.tracks.entry(track).or_default().play_audio = play_audio;
        self.send_cmd(PlayerCmd::SetTrackAudio(track, play_audio));
    }

    // ── Live input ─────────────────────────────────────────────────────

    pub fn key_down(&mut self, pitch: u8, velocity: u8) {
        self.send_cmd(PlayerCmd::KeyDown { pitch, velocity });
    }

    pub fn key_up(&mut self, pitch: u8) {
        self.send_cmd(PlayerCmd::KeyUp { pitch });
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Apply everything the engine reported since the last call. Call once
    /// per frame before reading positions or running queries.
    pub fn drain_feedback(&mut self) {
        while let Ok(event) = self.feedback_rx.try_recv() {
            self.apply_feedback(event);
        }
    }

    fn apply_feedback(&mut self, event: PlayerFeedback) {
        match event {
            PlayerFeedback::Position(time) => self.position = time,
            PlayerFeedback::PlayingChanged(on) => self.playing = on,
            PlayerFeedback::SpeedChanged(speed) => self.speed = speed,
            PlayerFeedback::WaitModeChanged(on) => self.wait_mode = on,
            PlayerFeedback::Waiting(on) => self.waiting = on,
            PlayerFeedback::NoteMissed(missed) => self.missed.push(missed),
            PlayerFeedback::Looped(time) => self.position = time,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
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

    /// True while the clock is frozen on an unplayed note.
    pub fn waiting(&self) -> bool {
        self.waiting
    }

    pub fn song(&self) -> Option<&Arc<Song>> {
        self.song.as_ref()
    }

    pub fn loop_span(&self) -> Option<LoopSpan> {
        self.loop_span
    }

    pub fn track_settings(&self) -> &TrackMap {
        &self.tracks
    }

    /// Note misses reported since the last call.
    pub fn take_missed(&mut self) -> Vec<MissedNote> {
        std::mem::take(&mut self.missed)
    }

    /// Notes in the render window around the current position.
    pub fn visible(&self, lookahead: f64) -> Vec<Note> {
        self.index.visible(self.position, lookahead, &self.tracks)
    }

    /// Notes sounding right now.
    pub fn active_notes(&self) -> Vec<Note> {
        self.index.active_at(self.position, &self.tracks)
    }

    fn rebuild_index(&mut self) {
        self.index = match &self.song {
            Some(song) => NoteIndex::build(song, &self.tracks),
            None => NoteIndex::default(),
        };
    }

    fn send_cmd(&self, cmd: PlayerCmd) {
        let tx = if cmd.is_priority() {
            &self.priority_tx
        } else {
            &self.normal_tx
        };
        if let Err(e) = tx.send(cmd) {
            log::warn!(target: "player", "command dropped: {}", e);
        }
    }
}

impl Default for PlayerHandle {
    /// Engine with no audio output, embedded config.
    fn default() -> Self {
        Self::new(Box::new(NullOut), &Config::embedded())
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.send_cmd(PlayerCmd::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
