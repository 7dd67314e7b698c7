//! Typed log records and their line format.

use crate::error::LogError;
use crate::hex;

/// One line of a session log.
///
/// The line format is `<tag>\t<payload fields...>`; field order is part of
/// the format and is parsed positionally on replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// `prv_init <sessionLabel>`: written once when the log is opened.
    Init { session: String },
    /// `prv_store_dbname <name>`: target database, once per connection.
    DbName(String),
    /// `prv_store_user <name>`: connecting user, once per connection.
    User(String),
    /// `prv_store_table <CREATE TABLE ...>`: reconstructable DDL, written
    /// the first time a table is captured.
    Table { ddl: String },
    /// `prv_store_row <rowid> <table> <INSERT INTO ...>`: one harvested or
    /// inserted row.
    Row {
        rowid: String,
        table: String,
        insert_sql: String,
    },
    /// `prv_store_insert <pid> <queryId> <version> <timestampMicros> <sql>`:
    /// one original INSERT statement.
    Insert {
        pid: u32,
        query_id: i64,
        version: i32,
        timestamp_micros: i64,
        sql: String,
    },
    /// `prv_store_read <counter> <byteLength> <hex>`: raw wire bytes.
    Read { counter: i64, payload: Vec<u8> },
}

impl LogRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            LogRecord::Init { .. } => "prv_init",
            LogRecord::DbName(_) => "prv_store_dbname",
            LogRecord::User(_) => "prv_store_user",
            LogRecord::Table { .. } => "prv_store_table",
            LogRecord::Row { .. } => "prv_store_row",
            LogRecord::Insert { .. } => "prv_store_insert",
            LogRecord::Read { .. } => "prv_store_read",
        }
    }

    /// Serialize to a log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            LogRecord::Init { session } => format!("prv_init\t{session}"),
            LogRecord::DbName(name) => format!("prv_store_dbname\t{name}"),
            LogRecord::User(name) => format!("prv_store_user\t{name}"),
            LogRecord::Table { ddl } => format!("prv_store_table\t{ddl}"),
            LogRecord::Row {
                rowid,
                table,
                insert_sql,
            } => format!("prv_store_row\t{rowid}\t{table}\t{insert_sql}"),
            LogRecord::Insert {
                pid,
                query_id,
                version,
                timestamp_micros,
                sql,
            } => format!(
                "prv_store_insert\t{pid}\t{query_id}\t{version}\t{timestamp_micros}\t{sql}"
            ),
            LogRecord::Read { counter, payload } => format!(
                "prv_store_read\t{counter}\t{}\t{}",
                payload.len(),
                hex::encode(payload)
            ),
        }
    }

    /// Parse one log line.
    pub fn parse(line: &str) -> Result<LogRecord, LogError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (tag, rest) = line.split_once('\t').unwrap_or((line, ""));

        let malformed = || LogError::Malformed {
            tag: tag.to_string(),
            line: line.to_string(),
        };

        match tag {
            "prv_init" => Ok(LogRecord::Init {
                session: rest.to_string(),
            }),
            "prv_store_dbname" => Ok(LogRecord::DbName(rest.to_string())),
            "prv_store_user" => Ok(LogRecord::User(rest.to_string())),
            "prv_store_table" => Ok(LogRecord::Table {
                ddl: rest.to_string(),
            }),
            "prv_store_row" => {
                let mut fields = rest.splitn(3, '\t');
                let rowid = fields.next().ok_or_else(malformed)?;
                let table = fields.next().ok_or_else(malformed)?;
                let insert_sql = fields.next().ok_or_else(malformed)?;
                Ok(LogRecord::Row {
                    rowid: rowid.to_string(),
                    table: table.to_string(),
                    insert_sql: insert_sql.to_string(),
                })
            }
            "prv_store_insert" => {
                let mut fields = rest.splitn(5, '\t');
                let pid = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let query_id = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let version = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let timestamp_micros = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let sql = fields.next().ok_or_else(malformed)?;
                Ok(LogRecord::Insert {
                    pid,
                    query_id,
                    version,
                    timestamp_micros,
                    sql: sql.to_string(),
                })
            }
            "prv_store_read" => {
                let mut fields = rest.splitn(3, '\t');
                let counter = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let length: usize = fields
                    .next()
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(malformed)?;
                let payload = hex::decode(fields.next().ok_or_else(malformed)?)?;
                if payload.len() != length {
                    return Err(malformed());
                }
                Ok(LogRecord::Read { counter, payload })
            }
            other => Err(LogError::UnknownTag {
                tag: other.to_string(),
            }),
        }
    }
}
