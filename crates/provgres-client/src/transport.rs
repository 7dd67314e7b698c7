//! Transport abstraction.
//!
//! The wire protocol is someone else's problem: this layer only needs
//! "submit text query, receive tagged result set or error". Putting a trait
//! at that seam keeps the dispatcher testable without a running Postgres and
//! leaves room for transports other than sqlx.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::outcome::QueryOutcome;

/// A synchronous-request/response query channel to one database.
///
/// Backend rejections come back as [`ExecStatus::Failed`] inside an `Ok`
/// outcome; `Err` is reserved for the transport itself breaking.
///
/// [`ExecStatus::Failed`]: crate::outcome::ExecStatus::Failed
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome, ClientError>;

    /// Name of the connected database.
    fn database(&self) -> &str;

    /// Name of the connected user.
    fn user(&self) -> &str;
}

/// Opens transports to arbitrary databases on one server.
///
/// The restore path needs this: it first connects to the administrative
/// database to issue `CREATE DATABASE`, then reconnects to the freshly
/// created target.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, database: &str) -> Result<Box<dyn QueryTransport>, ClientError>;

    /// Database name the connector was configured for.
    fn target_database(&self) -> &str;
}
