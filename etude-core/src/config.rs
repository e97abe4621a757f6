use std::path::PathBuf;

use serde::Deserialize;

use crate::player::playback::{MAX_SPEED, MIN_SPEED};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    midi: MidiConfig,
}

#[derive(Deserialize, Default)]
struct PlaybackConfig {
    grace_period_ms: Option<u64>,
    seek_threshold_ms: Option<u64>,
    default_speed: Option<f64>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    echo_input: Option<bool>,
    input_port: Option<String>,
    output_port: Option<String>,
}

pub struct Config {
    playback: PlaybackConfig,
    midi: MidiConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_playback(&mut base.playback, user.playback);
                            merge_midi(&mut base.midi, user.midi);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            playback: base.playback,
            midi: base.midi,
        }
    }

    /// Embedded defaults with no user override, for contexts where
    /// deterministic settings matter more than the user's file.
    pub fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Config {
            playback: base.playback,
            midi: base.midi,
        }
    }

    /// Grace period for early key presses, in seconds (clamped to 0..=2s).
    pub fn grace_period(&self) -> f64 {
        self.playback.grace_period_ms.unwrap_or(250).min(2_000) as f64 / 1_000.0
    }

    /// Smallest position jump treated as a seek, in seconds (clamped to
    /// 10..=1000 ms).
    pub fn seek_threshold(&self) -> f64 {
        self.playback.seek_threshold_ms.unwrap_or(50).clamp(10, 1_000) as f64 / 1_000.0
    }

    /// Initial speed multiplier (clamped to the same range the engine accepts).
    pub fn default_speed(&self) -> f64 {
        self.playback
            .default_speed
            .unwrap_or(1.0)
            .clamp(MIN_SPEED, MAX_SPEED)
    }

    /// Whether key presses are sounded through the audio output.
    pub fn echo_input(&self) -> bool {
        self.midi.echo_input.unwrap_or(true)
    }

    pub fn input_port(&self) -> Option<&str> {
        self.midi.input_port.as_deref()
    }

    pub fn output_port(&self) -> Option<&str> {
        self.midi.output_port.as_deref()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("etude").join("config.toml"))
}

fn merge_playback(base: &mut PlaybackConfig, user: PlaybackConfig) {
    if user.grace_period_ms.is_some() {
        base.grace_period_ms = user.grace_period_ms;
    }
    if user.seek_threshold_ms.is_some() {
        base.seek_threshold_ms = user.seek_threshold_ms;
    }
    if user.default_speed.is_some() {
        base.default_speed = user.default_speed;
    }
}

fn merge_midi(base: &mut MidiConfig, user: MidiConfig) {
    if user.echo_input.is_some() {
        base.echo_input = user.echo_input;
    }
    if user.input_port.is_some() {
        base.input_port = user.input_port;
    }
    if user.output_port.is_some() {
        base.output_port = user.output_port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::embedded();
        assert!((config.grace_period() - 0.25).abs() < f64::EPSILON);
        assert!((config.seek_threshold() - 0.05).abs() < f64::EPSILON);
        assert!((config.default_speed() - 1.0).abs() < f64::EPSILON);
        assert!(config.echo_input());
        assert!(config.input_port().is_none());
        assert!(config.output_port().is_none());
    }

    #[test]
    fn grace_period_is_clamped() {
        let config = Config {
            playback: PlaybackConfig {
                grace_period_ms: Some(60_000),
                ..Default::default()
            },
            midi: MidiConfig::default(),
        };
        assert!((config.grace_period() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seek_threshold_is_clamped() {
        let config = Config {
            playback: PlaybackConfig {
                seek_threshold_ms: Some(0),
                ..Default::default()
            },
            midi: MidiConfig::default(),
        };
        assert!((config.seek_threshold() - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn default_speed_is_clamped() {
        let config = Config {
            playback: PlaybackConfig {
                default_speed: Some(100.0),
                ..Default::default()
            },
            midi: MidiConfig::default(),
        };
        assert!((config.default_speed() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn user_values_override_defaults() {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        let user: ConfigFile = toml::from_str(
            r#"
            [playback]
            grace_period_ms = 400

            [midi]
            echo_input = false
            output_port = "FluidSynth"
            "#,
        )
        .unwrap();
        merge_playback(&mut base.playback, user.playback);
        merge_midi(&mut base.midi, user.midi);
        let config = Config {
            playback: base.playback,
            midi: base.midi,
        };
        assert!((config.grace_period() - 0.4).abs() < f64::EPSILON);
        // Unset user keys keep the embedded value
        assert!((config.default_speed() - 1.0).abs() < f64::EPSILON);
        assert!(!config.echo_input());
        assert_eq!(config.output_port(), Some("FluidSynth"));
    }
}
