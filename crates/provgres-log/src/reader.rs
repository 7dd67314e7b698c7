//! Replay log reader.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::record::LogRecord;

/// The replay side of a session log: a forward-only line scanner.
///
/// Scanning is cursor-based on purpose: [`ReplayLog::stored_dbname`] leaves
/// the cursor past the identity records, so a following
/// [`ReplayLog::remaining_records`] call replays only what comes after it,
/// the same single-pass shape the capture side wrote.
#[derive(Debug)]
pub struct ReplayLog {
    path: PathBuf,
    reader: BufReader<File>,
}

impl ReplayLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reset the cursor to the start of the log.
    pub fn rewind(&mut self) -> Result<(), LogError> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Scan forward for the first `prv_store_dbname` record.
    pub fn stored_dbname(&mut self) -> Result<Option<String>, LogError> {
        while let Some(record) = self.next_record()? {
            if let LogRecord::DbName(name) = record {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Read every record from the cursor to end of file. Lines that fail to
    /// parse are skipped with a warning; a capture log may legitimately be a
    /// crashed session's prefix with a torn final line.
    pub fn remaining_records(&mut self) -> Result<Vec<LogRecord>, LogError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Scan forward for the next raw-read record and return its payload.
    /// Used by the raw replay mode to feed captured wire bytes back in
    /// capture order.
    pub fn next_raw_read(&mut self) -> Result<Option<Vec<u8>>, LogError> {
        while let Some(record) = self.next_record()? {
            if let LogRecord::Read { payload, .. } = record {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Next parseable record, skipping malformed or unknown lines.
    fn next_record(&mut self) -> Result<Option<LogRecord>, LogError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_end_matches('\n');
            if trimmed.is_empty() {
                continue;
            }
            match LogRecord::parse(trimmed) {
                Ok(record) => return Ok(Some(record)),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable log line");
                }
            }
        }
    }
}
