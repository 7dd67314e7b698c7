//! Core types shared across the Provgres crates.
//!
//! Provgres is a client-side provenance layer for PostgreSQL: application
//! queries are intercepted, rewritten into provenance-preserving form and
//! recorded in a session log so the sequence of writes can be replayed later.
//! This crate holds the pieces everything else depends on: the session
//! [`Settings`] and operating [`Mode`], the [`djb2`] string hash used for
//! query ids and view names, and the [`DedupSet`] that keeps schema
//! modifications idempotent.

pub mod dedup;
pub mod hash;
pub mod mode;
pub mod settings;

pub use dedup::DedupSet;
pub use hash::djb2;
pub use mode::Mode;
pub use settings::{Settings, SettingsError};
