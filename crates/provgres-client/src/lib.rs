//! Provenance-tracking Postgres client.
//!
//! The [`Session`] dispatcher sits between an application and its database
//! connection: statements flow through [`Session::dispatch`], which rewrites
//! and shadows them with provenance work according to the configured mode,
//! and the restore entry points rebuild a database from a captured session
//! log. The [`QueryTransport`] trait is the only thing that touches the
//! wire; [`pg::PgTransport`] is the sqlx-backed implementation.

pub mod error;
pub mod harvest;
pub mod outcome;
pub mod pg;
pub mod restore;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ClientError;
pub use harvest::{discover_row_ids, TableRowIds};
pub use outcome::{ExecStatus, QueryOutcome};
pub use pg::{PgConnector, PgTransport};
pub use restore::{restore_database, restore_if_configured};
pub use session::Session;
pub use transport::{QueryTransport, TransportConnector};
