//! Error types for the client crate.

use provgres_log::LogError;
use thiserror::Error;

/// Errors that can surface from the provenance client.
///
/// Provenance side-effects (augmentation, harvesting, capture) never raise
/// these to the caller; they are traced and abandoned. What does surface is
/// transport-level failure of the caller's own statement and the fatal
/// replay conditions.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be reached or set up.
    #[error("transport error: {0}")]
    Transport(String),

    /// Session log I/O or format failure.
    #[error(transparent)]
    Log(#[from] LogError),

    /// The replay log was captured against a different database.
    #[error("stored database name '{stored}' does not match target '{requested}'")]
    DatabaseNameMismatch { stored: String, requested: String },

    /// The restore could not complete; the target database is not usable.
    #[error("restore aborted: {0}")]
    RestoreFailed(String),
}
