//! The engine thread: a dedicated loop that owns all playback state.
//!
//! Commands and clock ticks interleave on this one thread, so a key press
//! arriving between two ticks takes effect atomically and no state is ever
//! read half-updated. The thread never blocks on audio or I/O; "waiting"
//! in wait mode is just the clock declining to advance.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use etude_types::PlayerFeedback;

use crate::config::Config;
use crate::player::commands::PlayerCmd;
use crate::player::output::AudioOut;
use crate::player::playback::{tick_player, PlayerState};

/// Channel live key echoes sound on.
const ECHO_CHANNEL: u8 = 0;

pub(crate) struct PlayerThread {
    state: PlayerState,
    out: Box<dyn AudioOut>,
    /// Sound live key presses through the output.
    echo_input: bool,
    /// Priority commands: key events and transport (time-critical)
    priority_rx: Receiver<PlayerCmd>,
    /// Normal commands: song loads, track toggles
    normal_rx: Receiver<PlayerCmd>,
    feedback_tx: Sender<PlayerFeedback>,
    last_tick: Instant,
}

impl PlayerThread {
    pub(crate) fn new(
        priority_rx: Receiver<PlayerCmd>,
        normal_rx: Receiver<PlayerCmd>,
        feedback_tx: Sender<PlayerFeedback>,
        out: Box<dyn AudioOut>,
        config: &Config,
    ) -> Self {
        Self {
            state: PlayerState::new(
                config.grace_period(),
                config.default_speed(),
                config.seek_threshold(),
            ),
            out,
            echo_input: config.echo_input(),
            priority_rx,
            normal_rx,
            feedback_tx,
            last_tick: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        const TICK_INTERVAL: Duration = Duration::from_millis(1);

        loop {
            // Priority channel is always checked before the normal one, so
            // a press is never stuck behind a bulk update.
            let remaining = TICK_INTERVAL.saturating_sub(self.last_tick.elapsed());

            crossbeam_channel::select! {
                recv(self.priority_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                recv(self.normal_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                // Timeout - proceed with tick
                default(remaining) => {}
            }

            if self.drain_priority_commands() {
                break;
            }
            if self.drain_normal_commands() {
                break;
            }

            let now = Instant::now();
            let elapsed = now.duration_since(self.last_tick);
            if elapsed >= TICK_INTERVAL {
                self.last_tick = now;
                self.tick(elapsed);
            }
        }

        self.out.all_notes_off();
        log::info!(target: "player", "engine thread stopped");
    }

    /// Time-budgeted drain so a flood of commands cannot starve the clock.
    fn drain_priority_commands(&mut self) -> bool {
        const MAX_DURATION: Duration = Duration::from_micros(200);
        const MAX_COUNT: usize = 128;

        let start = Instant::now();
        for _ in 0..MAX_COUNT {
            if start.elapsed() >= MAX_DURATION {
                break;
            }
            match self.priority_rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn drain_normal_commands(&mut self) -> bool {
        const MAX_DURATION: Duration = Duration::from_micros(100);
        const MAX_COUNT: usize = 64;

        let start = Instant::now();
        for _ in 0..MAX_COUNT {
            if start.elapsed() >= MAX_DURATION {
                break;
            }
            match self.normal_rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn tick(&mut self, elapsed: Duration) {
        let mut feedback = Vec::new();
        tick_player(
            &mut self.state,
            elapsed.as_secs_f64(),
            self.out.as_mut(),
            &mut feedback,
        );
        for event in feedback {
            self.send(event);
        }
    }

    /// Returns true when the thread should shut down.
    fn handle_cmd(&mut self, cmd: PlayerCmd) -> bool {
        use PlayerCmd::*;
        match cmd {
            LoadSong(song) => {
                log::info!(
                    target: "player",
                    "loading '{}' ({} tracks, {} notes)",
                    song.name,
                    song.tracks.len(),
                    song.note_count()
                );
                self.state.load_song(song, self.out.as_mut());
                self.send(PlayerFeedback::Position(0.0));
                self.send(PlayerFeedback::PlayingChanged(false));
            }
            ClearSong => {
                self.state.clear_song(self.out.as_mut());
                self.send(PlayerFeedback::Position(0.0));
                self.send(PlayerFeedback::PlayingChanged(false));
            }
            SetPlaying(on) => {
                let was = self.state.playing();
                let now = self.state.set_playing(on, self.out.as_mut());
                if was != now {
                    self.send(PlayerFeedback::PlayingChanged(now));
                }
            }
            Stop => {
                let was = self.state.playing();
                self.state.stop(self.out.as_mut());
                if was {
                    self.send(PlayerFeedback::PlayingChanged(false));
                }
                self.send(PlayerFeedback::Position(0.0));
            }
            Seek(time) => {
                // The next tick notices the jump and snaps
                self.state.seek(time);
            }
            SetSpeed(speed) => {
                let effective = self.state.set_speed(speed);
                self.send(PlayerFeedback::SpeedChanged(effective));
            }
            SetWaitMode(on) => {
                if on != self.state.wait_mode() {
                    self.state.set_wait_mode(on);
                    self.send(PlayerFeedback::WaitModeChanged(on));
                }
            }
            SetLoop(span) => {
                log::debug!(
                    target: "player",
                    "loop measures {}..{} ({:.2}s..{:.2}s)",
                    span.start_measure,
                    span.end_measure,
                    span.start,
                    span.end
                );
                self.state.set_loop(span);
            }
            ClearLoop => self.state.clear_loop(),
            SetTrackEnabled(track, on) => {
                self.state.set_track_enabled(track, on, self.out.as_mut());
            }
            SetTrackAudio(track, on) => {
                self.state.set_track_audio(track, on, self.out.as_mut());
            }
            KeyDown { pitch, velocity } => {
                if self.echo_input {
                    self.out.note_on(ECHO_CHANNEL, pitch, velocity);
                }
                self.state.key_down(pitch);
            }
            KeyUp { pitch } => {
                if self.echo_input {
                    self.out.note_off(ECHO_CHANNEL, pitch);
                }
            }
            Shutdown => return true,
        }
        false
    }

    fn send(&self, event: PlayerFeedback) {
        let _ = self.feedback_tx.send(event);
    }
}
