//! The capture/replay session log.
//!
//! A session log is a newline-terminated, tab-separated text file. The first
//! field of every line is a record tag; the rest is positional payload. The
//! replay side parses the format positionally, so the writer must never
//! change separators or field order.
//!
//! A process holds at most one log handle: a [`CaptureLog`] opened for
//! append in the capture modes, or a [`ReplayLog`] opened for read in the
//! replay modes. Which one is decided once, from the session mode, at init.

pub mod error;
pub mod hex;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::LogError;
pub use reader::ReplayLog;
pub use record::LogRecord;
pub use writer::CaptureLog;
