//! Operating mode for a provenance session.
//!
//! The mode is a small integer taken from the environment. The tens digit
//! selects the scenario, the ones digit selects capture (1) versus replay
//! (2): `21`/`22` capture and replay whole statements, `31`/`32` capture and
//! replay raw wire bytes, `11` leaves capture to an outer layer, `0` turns
//! the provenance machinery off entirely.

use serde::{Deserialize, Serialize};

/// What a session does with the queries that pass through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Mode {
    /// Provenance off; every query is forwarded untouched.
    #[default]
    Disabled,
    /// Forward untouched; an outer layer does its own capture.
    Passive,
    /// Rewrite queries and append statement-level records to the session log.
    Capture,
    /// Rebuild a database from a previously captured session log.
    Replay,
    /// Forward untouched but capture raw wire reads to the session log.
    CaptureRaw,
    /// Feed previously captured raw wire reads back to the caller.
    ReplayRaw,
}

impl Mode {
    /// Decode the `PTU_DB_MODE` integer. Unknown codes disable provenance.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Mode::Disabled,
            11 => Mode::Passive,
            21 => Mode::Capture,
            22 => Mode::Replay,
            31 => Mode::CaptureRaw,
            32 => Mode::ReplayRaw,
            other => {
                tracing::warn!(code = other, "unknown provenance mode, disabling");
                Mode::Disabled
            }
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Mode::Disabled => 0,
            Mode::Passive => 11,
            Mode::Capture => 21,
            Mode::Replay => 22,
            Mode::CaptureRaw => 31,
            Mode::ReplayRaw => 32,
        }
    }

    /// Only statement capture rewrites queries; every other mode forwards
    /// them unmodified.
    pub fn rewrites_queries(self) -> bool {
        self == Mode::Capture
    }

    pub fn opens_capture_log(self) -> bool {
        matches!(self, Mode::Capture | Mode::CaptureRaw)
    }

    pub fn opens_replay_log(self) -> bool {
        matches!(self, Mode::Replay | Mode::ReplayRaw)
    }

    pub fn restores_database(self) -> bool {
        self == Mode::Replay
    }
}

impl From<i32> for Mode {
    fn from(code: i32) -> Self {
        Mode::from_code(code)
    }
}

impl From<Mode> for i32 {
    fn from(mode: Mode) -> Self {
        mode.code()
    }
}
