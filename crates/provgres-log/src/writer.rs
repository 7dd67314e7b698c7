//! Append-only capture log writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::error::LogError;
use crate::record::LogRecord;

/// The capture side of a session log.
///
/// Created once at session init when the mode calls for capture, named
/// `<sessionId>.<pid>.dblog`, and append-only for the life of the session.
/// Each record is flushed as it is written so a crashed session still leaves
/// a replayable prefix.
#[derive(Debug)]
pub struct CaptureLog {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
    package_counter: AtomicI64,
}

impl CaptureLog {
    /// Create the log file and write the opening `prv_init` record.
    pub fn create(
        directory: &Path,
        session_id: i32,
        pid: u32,
        session_label: &str,
    ) -> Result<Self, LogError> {
        let path = directory.join(format!("{session_id}.{pid}.dblog"));
        let file = File::create(&path)?;
        let log = Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
            package_counter: AtomicI64::new(0),
        };
        log.append(&LogRecord::Init {
            session: session_label.to_string(),
        })?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush.
    pub fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(file, "{}", record.to_line())?;
        file.flush()?;
        Ok(())
    }

    /// Record the connection identity. The caller guarantees this is
    /// written at most once per connection.
    pub fn store_connection(&self, database: &str, user: &str) -> Result<(), LogError> {
        self.append(&LogRecord::DbName(database.to_string()))?;
        self.append(&LogRecord::User(user.to_string()))
    }

    pub fn store_table(&self, ddl: &str) -> Result<(), LogError> {
        self.append(&LogRecord::Table {
            ddl: ddl.to_string(),
        })
    }

    pub fn store_row(&self, rowid: &str, table: &str, insert_sql: &str) -> Result<(), LogError> {
        self.append(&LogRecord::Row {
            rowid: rowid.to_string(),
            table: table.to_string(),
            insert_sql: insert_sql.to_string(),
        })
    }

    pub fn store_insert(
        &self,
        pid: u32,
        query_id: i64,
        version: i32,
        timestamp_micros: i64,
        sql: &str,
    ) -> Result<(), LogError> {
        self.append(&LogRecord::Insert {
            pid,
            query_id,
            version,
            timestamp_micros,
            sql: sql.to_string(),
        })
    }

    /// Capture one raw wire read. Returns the package counter assigned to
    /// the record; counters are monotonic so replay can preserve ordering.
    pub fn store_read(&self, payload: &[u8]) -> Result<i64, LogError> {
        let counter = self.package_counter.fetch_add(1, Ordering::SeqCst);
        self.append(&LogRecord::Read {
            counter,
            payload: payload.to_vec(),
        })?;
        Ok(counter)
    }
}
