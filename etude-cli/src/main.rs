//! Console front end for the etude practice player.
//!
//! Wires a MIDI keyboard and a MIDI output into the playback engine and
//! drives the transport from a small line console on stdin. The engine does
//! the timing; this binary only forwards key events, applies commands and
//! prints what the engine reports back.

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use etude_core::config;
use etude_core::{AudioOut, KeyEvent, KeyInput, MidiOut, NullOut, PlayerHandle};
use etude_types::{pitch_name, track_audible, track_enabled, Song, TrackId};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("etude")
        .join("etude.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::File::create(&log_path).unwrap_or_else(|_| {
        std::fs::File::create("/tmp/etude.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("etude starting (log level: {:?})", log_level);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }
    if args.iter().any(|a| a == "--list-ports") {
        print_ports();
        return;
    }

    let config = config::Config::load();

    let out = open_output(&args, &config);
    let mut handle = PlayerHandle::new(out, &config);
    let keys = open_input(&args, &config);

    let song = build_demo_song();
    println!("etude — MIDI practice player");
    println!(
        "song: {} ({} notes, {:.1}s)",
        song.name,
        song.note_count(),
        song.duration
    );
    for track in &song.tracks {
        println!(
            "  track {}: {} ({} notes, ch {})",
            track.id,
            track.name,
            track.notes.len(),
            track.channel
        );
    }
    println!("type 'help' for commands\n");
    handle.load_song(song);

    if args.iter().any(|a| a == "--wait") {
        handle.set_wait_mode(true);
    }
    if let Some(speed) = arg_value(&args, "--speed").and_then(|s| s.parse().ok()) {
        handle.set_speed(speed);
    }
    if let Some(i) = args.iter().position(|a| a == "--loop") {
        let bounds = (
            args.get(i + 1).and_then(|s| s.parse::<usize>().ok()),
            args.get(i + 2).and_then(|s| s.parse::<usize>().ok()),
        );
        match bounds {
            (Some(start), Some(end)) => {
                if let Err(e) = handle.set_loop_range(start, end) {
                    eprintln!("--loop: {}", e);
                }
            }
            _ => eprintln!("--loop expects two measure numbers"),
        }
    }

    run(handle, keys);
}

/// Value following a flag, e.g. `--in 1` or `--out "Through Port"`.
fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn open_output(args: &[String], config: &config::Config) -> Box<dyn AudioOut> {
    let wanted = arg_value(args, "--out")
        .map(str::to_string)
        .or_else(|| config.output_port().map(str::to_string));

    let connected = match wanted.as_deref() {
        Some(sel) => match sel.parse::<usize>() {
            Ok(index) => MidiOut::connect(index),
            Err(_) => MidiOut::connect_named(sel),
        },
        // Default to the first available port
        None if !MidiOut::list_ports().is_empty() => MidiOut::connect(0),
        None => Err("no MIDI output ports".to_string()),
    };

    match connected {
        Ok(out) => {
            println!("output: {}", out.port_name());
            Box::new(out)
        }
        Err(e) => {
            eprintln!("running silent: {}", e);
            Box::new(NullOut)
        }
    }
}

fn open_input(args: &[String], config: &config::Config) -> KeyInput {
    let mut keys = KeyInput::new();
    let wanted = arg_value(args, "--in")
        .map(str::to_string)
        .or_else(|| config.input_port().map(str::to_string));

    let connected = match wanted.as_deref() {
        Some(sel) => match sel.parse::<usize>() {
            Ok(index) => keys.connect(index),
            Err(_) => keys.connect_named(sel),
        },
        None if !KeyInput::list_ports().is_empty() => keys.connect(0),
        None => Err("no MIDI input ports".to_string()),
    };

    match connected {
        Ok(()) => println!("input:  {}", keys.port_name().unwrap_or("?")),
        Err(e) => eprintln!("no MIDI input: {}", e),
    }
    keys
}

/// Four measures of C major at 120 BPM: a scale line over held bass notes.
/// Stands in for a parsed file until a loader feeds real songs in.
fn build_demo_song() -> Song {
    let mut song = Song::new("c major etude");
    let quarter = 0.5;

    let lead = song.add_track("lead", 0);
    if let Some(track) = song.track_mut(lead) {
        let line: [u8; 16] = [
            60, 62, 64, 65, 67, 69, 71, 72, 72, 71, 69, 67, 65, 64, 62, 60,
        ];
        for (i, pitch) in line.iter().enumerate() {
            track.add_note(*pitch, i as f64 * quarter, quarter * 0.9, 96);
        }
    }

    let bass = song.add_track("bass", 1);
    if let Some(track) = song.track_mut(bass) {
        for (i, pitch) in [48u8, 43, 41, 48].iter().enumerate() {
            track.add_note(*pitch, i as f64 * 2.0, 1.9, 72);
        }
    }

    song.recompute_duration();
    song.set_uniform_measures(quarter * 4.0);
    song
}

fn run(mut handle: PlayerHandle, keys: KeyInput) {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut was_waiting = false;
    loop {
        match line_rx.recv_timeout(Duration::from_millis(2)) {
            Ok(line) => {
                if handle_line(line.trim(), &mut handle) {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        for event in keys.poll_events() {
            match event {
                KeyEvent::Down { pitch, velocity } => handle.key_down(pitch, velocity),
                KeyEvent::Up { pitch } => handle.key_up(pitch),
            }
        }

        handle.drain_feedback();

        for miss in handle.take_missed() {
            println!("missed {} at {:.2}s", pitch_name(miss.pitch), miss.start);
        }

        if handle.waiting() != was_waiting {
            was_waiting = handle.waiting();
            if was_waiting {
                let due = due_names(&handle);
                if due.is_empty() {
                    println!("waiting for your note");
                } else {
                    println!("waiting: play {}", due);
                }
            }
        }
    }
}

/// One console command. Returns true when the session should end.
fn handle_line(line: &str, handle: &mut PlayerHandle) -> bool {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return false;
    };

    match cmd {
        "q" | "quit" => return true,
        "h" | "help" | "?" => print_help(),
        "p" | "play" | "pause" => {
            handle.toggle_play();
            println!("{}", if handle.playing() { "playing" } else { "paused" });
        }
        "stop" => {
            handle.stop();
            println!("stopped");
        }
        "seek" => match words.next().and_then(|w| w.parse::<f64>().ok()) {
            Some(t) => {
                handle.seek(t);
                println!("→ {:.2}s", handle.position());
            }
            None => println!("usage: seek <seconds>"),
        },
        "speed" => match words.next().and_then(|w| w.parse::<f64>().ok()) {
            Some(x) => {
                handle.set_speed(x);
                println!("speed {:.2}x", handle.speed());
            }
            None => println!("usage: speed <multiplier>"),
        },
        "w" | "wait" => {
            handle.toggle_wait_mode();
            println!(
                "wait mode {}",
                if handle.wait_mode() { "on" } else { "off" }
            );
        }
        "loop" => match words.next() {
            Some("off") => {
                handle.clear_loop();
                println!("loop off");
            }
            Some(first) => {
                let bounds = (
                    first.parse::<usize>().ok(),
                    words.next().and_then(|w| w.parse::<usize>().ok()),
                );
                match bounds {
                    (Some(a), Some(b)) => match handle.set_loop_range(a, b) {
                        Ok(()) => println!("looping measures {}..{}", a, b),
                        Err(e) => println!("{}", e),
                    },
                    _ => println!("usage: loop <start> <end> | loop off"),
                }
            }
            None => println!("usage: loop <start> <end> | loop off"),
        },
        "tracks" => print_track_states(handle),
        "track" => match words.next().and_then(|w| w.parse::<u32>().ok()) {
            Some(n) => toggle_track(handle, TrackId::new(n), false),
            None => println!("usage: track <id>"),
        },
        "mute" => match words.next().and_then(|w| w.parse::<u32>().ok()) {
            Some(n) => toggle_track(handle, TrackId::new(n), true),
            None => println!("usage: mute <id>"),
        },
        "st" | "status" => print_status(handle),
        "n" | "next" => print_upcoming(handle),
        other => println!("unknown command '{}' (help for the list)", other),
    }
    false
}

fn toggle_track(handle: &mut PlayerHandle, id: TrackId, audio_only: bool) {
    if handle.song().and_then(|s| s.track(id)).is_none() {
        println!("no track {}", id);
        return;
    }
    if audio_only {
        let on = !handle.track_settings().get(&id).map_or(true, |s| s.play_audio);
        handle.set_track_audio(id, on);
        println!("track {} audio {}", id, if on { "on" } else { "off" });
    } else {
        let on = !track_enabled(handle.track_settings(), id);
        handle.set_track_enabled(id, on);
        println!("track {} {}", id, if on { "enabled" } else { "disabled" });
    }
}

fn print_track_states(handle: &PlayerHandle) {
    let Some(song) = handle.song() else {
        println!("no song");
        return;
    };
    for track in &song.tracks {
        let enabled = track_enabled(handle.track_settings(), track.id);
        let audible = track_audible(handle.track_settings(), track.id);
        let state = match (enabled, audible) {
            (false, _) => "off",
            (true, false) => "silent",
            (true, true) => "on",
        };
        println!(
            "  {}  {:8} {:3} notes  ch {}  [{}]",
            track.id,
            track.name,
            track.notes.len(),
            track.channel,
            state
        );
    }
}

fn print_status(handle: &PlayerHandle) {
    let duration = handle.song().map(|s| s.duration).unwrap_or(0.0);
    let transport = if handle.waiting() {
        "waiting"
    } else if handle.playing() {
        "playing"
    } else {
        "paused"
    };
    print!(
        "{:.2}s / {:.2}s  {}  {:.2}x",
        handle.position(),
        duration,
        transport,
        handle.speed()
    );
    if handle.wait_mode() {
        print!("  [wait]");
    }
    if let Some(span) = handle.loop_span() {
        print!("  [loop {}..{}]", span.start_measure, span.end_measure);
    }
    println!();
}

fn print_upcoming(handle: &PlayerHandle) {
    let notes = handle.visible(2.0);
    if notes.is_empty() {
        println!("nothing in the next two seconds");
        return;
    }
    for note in notes.iter().take(12) {
        println!(
            "  {:6.2}s  {:4}  track {}",
            note.start,
            pitch_name(note.pitch),
            note.track
        );
    }
}

/// Pitch names at the frozen playhead, the notes the player owes right now.
/// The engine freezes at most one tick shy of the blocking note's start, so
/// a small window either side of the position catches it.
fn due_names(handle: &PlayerHandle) -> String {
    let position = handle.position();
    let mut names: Vec<String> = handle
        .visible(0.05)
        .iter()
        .filter(|n| (n.start - position).abs() <= 0.06)
        .map(|n| pitch_name(n.pitch))
        .collect();
    names.dedup();
    names.join(" ")
}

fn print_usage() {
    println!("usage: etude [options]");
    println!();
    println!("  --list-ports      list MIDI ports and exit");
    println!("  --in <n|name>     MIDI input port (index or name substring)");
    println!("  --out <n|name>    MIDI output port (index or name substring)");
    println!("  --wait            start with wait-for-key mode on");
    println!("  --speed <x>       playback rate");
    println!("  --loop <a> <b>    loop measures a..b");
    println!("  -v, --verbose     debug logging");
}

fn print_ports() {
    println!("MIDI inputs:");
    for (i, name) in KeyInput::list_ports().iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    println!("MIDI outputs:");
    for (i, name) in MidiOut::list_ports().iter().enumerate() {
        println!("  {}: {}", i, name);
    }
}

fn print_help() {
    println!("  p, play, pause     toggle playback");
    println!("  stop               rewind to the start");
    println!("  seek <seconds>     jump");
    println!("  speed <x>          playback rate");
    println!("  w, wait            toggle wait-for-key mode");
    println!("  loop <a> <b>       loop measures a..b; 'loop off' clears");
    println!("  tracks             list tracks");
    println!("  track <id>         enable/disable a track");
    println!("  mute <id>          toggle a track's audio");
    println!("  st, status         transport snapshot");
    println!("  n, next            notes in the next two seconds");
    println!("  q, quit            exit");
}
