//! Query outcomes as seen by the provenance layer.
//!
//! The transport hands back an opaque result object with row/field
//! accessors; the accessors follow libpq conventions (NULL reads as the
//! empty string, column lookup by name) because the harvester's logic was
//! shaped around them.

/// Coarse execution status of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    /// Statement ran and produced no row set (DDL, plain DML).
    CommandOk,
    /// Statement ran and produced a (possibly empty) row set.
    RowsReturned,
    /// Empty statement.
    EmptyQuery,
    /// The backend rejected the statement.
    Failed(String),
}

/// The result of executing one statement.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub status: ExecStatus,
    pub command_tag: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryOutcome {
    pub fn command_ok(tag: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::CommandOk,
            command_tag: tag.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            status: ExecStatus::RowsReturned,
            command_tag: format!("SELECT {}", rows.len()),
            columns,
            rows,
        }
    }

    pub fn empty_query() -> Self {
        Self {
            status: ExecStatus::EmptyQuery,
            command_tag: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Failed(message.into()),
            command_tag: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Whether the backend accepted the statement.
    pub fn is_ok(&self) -> bool {
        !matches!(self.status, ExecStatus::Failed(_))
    }

    pub fn ntuples(&self) -> usize {
        self.rows.len()
    }

    pub fn nfields(&self) -> usize {
        self.columns.len()
    }

    /// Value at (row, column); NULL and out-of-range both read as "".
    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Index of a column by name.
    pub fn fnumber(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}
