//! Database reconstruction from a replay log.

use std::path::Path;

use provgres_core::Settings;
use provgres_log::{LogRecord, ReplayLog};

use crate::error::ClientError;
use crate::outcome::ExecStatus;
use crate::transport::TransportConnector;

/// Run the restore when the mode calls for one. Returns whether a restore
/// happened.
pub async fn restore_if_configured(
    settings: &Settings,
    connector: &dyn TransportConnector,
) -> Result<bool, ClientError> {
    if !settings.mode.restores_database() {
        return Ok(false);
    }
    let Some(path) = &settings.replay_path else {
        return Err(ClientError::RestoreFailed(
            "replay mode set but no replay log configured".to_string(),
        ));
    };
    restore_database(connector, path).await?;
    Ok(true)
}

/// Rebuild the connector's target database from a replay log.
///
/// The log must have been captured against a database of the same name;
/// `CREATE DATABASE` runs through the administrative database, then every
/// stored table and row is replayed into the target. The first schema
/// statement must succeed (anything else means the target is not a fresh
/// database); later statements are replayed best-effort, since harvest
/// order can legitimately store a row twice.
pub async fn restore_database(
    connector: &dyn TransportConnector,
    replay_path: &Path,
) -> Result<(), ClientError> {
    let mut log = ReplayLog::open(replay_path)?;
    let stored = log.stored_dbname()?.ok_or_else(|| {
        ClientError::RestoreFailed("replay log has no stored database name".to_string())
    })?;
    let requested = connector.target_database().to_string();
    if stored != requested {
        return Err(ClientError::DatabaseNameMismatch { stored, requested });
    }

    let admin = connector.connect("postgres").await?;
    let outcome = admin.execute(&format!("CREATE DATABASE {requested};")).await?;
    if !outcome.is_ok() {
        tracing::warn!(database = %requested, status = ?outcome.status, "CREATE DATABASE rejected, continuing");
    }

    let target = connector.connect(&requested).await?;
    let mut schema_verified = false;
    let mut tables = 0usize;
    let mut rows = 0usize;

    for record in log.remaining_records()? {
        match record {
            LogRecord::Table { ddl } => {
                let outcome = target.execute(&ddl).await?;
                if !schema_verified {
                    schema_verified = true;
                    if outcome.status != ExecStatus::CommandOk {
                        return Err(ClientError::RestoreFailed(format!(
                            "stored schema was rejected: {ddl}"
                        )));
                    }
                } else if !outcome.is_ok() {
                    tracing::warn!(status = ?outcome.status, "stored schema statement rejected");
                }
                tables += 1;
            }
            LogRecord::Row {
                rowid,
                table,
                insert_sql,
            } => {
                let outcome = target.execute(&insert_sql).await?;
                if !outcome.is_ok() {
                    tracing::warn!(table = %table, rowid = %rowid, "stored row rejected");
                }
                rows += 1;
            }
            _ => {}
        }
    }

    tracing::info!(database = %requested, tables, rows, "database restored from replay log");
    Ok(())
}
