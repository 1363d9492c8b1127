//! Application-level configuration loading, including game session parameters.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::{DEFAULT_ROUNDS, DEFAULT_TIME_FRAME, SessionSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "IQ180_BACK_CONFIG_PATH";
/// Players admitted per room unless configured otherwise.
const DEFAULT_MAX_PLAYERS: usize = 2;
/// Length of generated room codes unless configured otherwise.
const DEFAULT_ROOM_CODE_LENGTH: usize = 5;
/// Shortest accepted room code, keeping the code space far larger than the room count.
const MIN_ROOM_CODE_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    time_frame: u32,
    rounds: usize,
    max_players: usize,
    room_code_length: usize,
    autostart: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        time_frame = app_config.time_frame,
                        rounds = app_config.rounds,
                        max_players = app_config.max_players,
                        autostart = app_config.autostart,
                        "loaded game settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Parameters handed to every new game session.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            time_frame: self.time_frame,
            rounds: self.rounds,
        }
    }

    /// Roster capacity of each room.
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Length of generated room codes.
    pub fn room_code_length(&self) -> usize {
        self.room_code_length
    }

    /// Whether a room starts its game as soon as its roster is full.
    pub fn autostart(&self) -> bool {
        self.autostart
    }

    /// Enable or disable autostart.
    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    time_frame_secs: u32,
    rounds: usize,
    max_players: usize,
    room_code_length: usize,
    autostart: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            time_frame_secs: DEFAULT_TIME_FRAME,
            rounds: DEFAULT_ROUNDS,
            max_players: DEFAULT_MAX_PLAYERS,
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
            autostart: false,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        // A game needs at least one puzzle, one second per turn and two seats.
        Self {
            time_frame: value.time_frame_secs.max(1),
            rounds: value.rounds.max(1),
            max_players: value.max_players.max(2),
            room_code_length: value.room_code_length.max(MIN_ROOM_CODE_LENGTH),
            autostart: value.autostart,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let config = AppConfig::from_json_str(r#"{ "rounds": 5 }"#).unwrap();
        assert_eq!(config.session_settings().rounds, 5);
        assert_eq!(config.session_settings().time_frame, DEFAULT_TIME_FRAME);
        assert_eq!(config.max_players(), DEFAULT_MAX_PLAYERS);
        assert_eq!(config.room_code_length(), DEFAULT_ROOM_CODE_LENGTH);
        assert!(!config.autostart());
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let config = AppConfig::from_json_str(
            r#"{ "time_frame_secs": 0, "rounds": 0, "max_players": 1, "room_code_length": 1, "autostart": true }"#,
        )
        .unwrap();
        assert_eq!(
            config.session_settings(),
            SessionSettings {
                time_frame: 1,
                rounds: 1
            }
        );
        assert_eq!(config.max_players(), 2);
        assert_eq!(config.room_code_length(), MIN_ROOM_CODE_LENGTH);
        assert!(config.autostart());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(AppConfig::from_json_str(r#"{ "rounds": "three" }"#).is_err());
    }
}
