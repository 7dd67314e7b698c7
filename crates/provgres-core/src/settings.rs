//! Session settings.
//!
//! The C ancestor of this layer kept its mode, session id and file handles in
//! file-scope statics initialized from the environment. Here the same values
//! live in an explicit [`Settings`] struct constructed once at startup and
//! passed into the session, which keeps multiple independent sessions per
//! process possible and the whole thing testable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::Mode;

/// Environment variable selecting the operating mode (integer code).
pub const ENV_MODE: &str = "PTU_DB_MODE";
/// Environment variable carrying the session id used to claim rows.
pub const ENV_SESSION_ID: &str = "PTU_DBSESSION_ID";
/// Environment variable pointing at the replay log file.
pub const ENV_REPLAY_PATH: &str = "PTU_DB_REPLAY";

/// Errors raised while building [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("environment variable {var} holds '{value}', expected an integer")]
    InvalidInteger { var: String, value: String },

    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a provenance session needs to know at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Operating mode; immutable for the session's lifetime.
    #[serde(default)]
    pub mode: Mode,

    /// Session id stamped on every claimed row and derived insert.
    #[serde(default)]
    pub session_id: i32,

    /// Path of the replay log, required by the replay modes.
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Directory the capture log is created in.
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,

    /// Whether UPDATE/DELETE probes also claim and persist the rows they
    /// touch. Off by default: mutation provenance is normally tracked by the
    /// `_prov_v`/`_prov_insertedby` columns alone.
    #[serde(default)]
    pub harvest_mutations: bool,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Disabled,
            session_id: 0,
            replay_path: None,
            log_directory: default_log_directory(),
            harvest_mutations: false,
        }
    }
}

impl Settings {
    /// Read the settings from the process environment.
    ///
    /// Missing variables fall back to defaults (provenance disabled,
    /// session id 0); present-but-malformed integers are an error.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mode = match std::env::var(ENV_MODE) {
            Ok(value) => Mode::from_code(parse_int(ENV_MODE, &value)?),
            Err(_) => Mode::Disabled,
        };
        let session_id = match std::env::var(ENV_SESSION_ID) {
            Ok(value) => parse_int(ENV_SESSION_ID, &value)?,
            Err(_) => 0,
        };
        let replay_path = std::env::var_os(ENV_REPLAY_PATH).map(PathBuf::from);

        Ok(Self {
            mode,
            session_id,
            replay_path,
            ..Self::default()
        })
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn parse_int(var: &str, value: &str) -> Result<i32, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidInteger {
            var: var.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_disabled() {
        let settings = Settings::default();
        assert_eq!(settings.mode, Mode::Disabled);
        assert_eq!(settings.session_id, 0);
        assert!(settings.replay_path.is_none());
        assert!(!settings.harvest_mutations);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"mode": 21, "session_id": 7, "replay_path": null, "harvest_mutations": true}"#,
        )
        .unwrap();

        let settings = Settings::from_json_file(&path).unwrap();
        assert_eq!(settings.mode, Mode::Capture);
        assert_eq!(settings.session_id, 7);
        assert!(settings.harvest_mutations);
        assert_eq!(settings.log_directory, PathBuf::from("."));
    }

    #[test]
    fn unknown_mode_code_in_file_disables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"mode": 77}"#).unwrap();

        let settings = Settings::from_json_file(&path).unwrap();
        assert_eq!(settings.mode, Mode::Disabled);
    }
}
