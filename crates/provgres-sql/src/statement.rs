//! Parsed statement: classification plus extracted segments.

use crate::classify::{classify, StatementKind};
use crate::split::split;

/// A classified statement with its marker-extracted segments.
///
/// Segments that a statement family does not produce stay empty; `body` is
/// only meaningful for [`StatementKind::Bypass`], where it carries the text
/// to forward verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub table: String,
    pub fields: String,
    pub where_clause: String,
    pub values: String,
    pub returning: String,
    pub body: String,
}

impl Statement {
    /// Classify and split a full statement. `None` means the statement is
    /// not one of the five recognized families and passes through untouched.
    pub fn parse(sql: &str) -> Option<Statement> {
        let (kind, body) = classify(sql)?;
        Some(Self::from_body(kind, body))
    }

    /// Split an already-classified statement body.
    pub fn from_body(kind: StatementKind, body: &str) -> Statement {
        let mut stmt = Statement {
            kind,
            table: String::new(),
            fields: String::new(),
            where_clause: String::new(),
            values: String::new(),
            returning: String::new(),
            body: String::new(),
        };

        match kind {
            StatementKind::Select => {
                let mut segments = split(body, &["from", "where"]);
                stmt.where_clause = segments.pop().unwrap_or_default();
                stmt.table = segments.pop().unwrap_or_default();
                stmt.fields = segments.pop().unwrap_or_default();
            }
            StatementKind::Insert => {
                let mut segments = split(body, &["values", "returning"]);
                stmt.returning = segments.pop().unwrap_or_default();
                stmt.values = segments.pop().unwrap_or_default();
                stmt.table = segments.pop().unwrap_or_default();
            }
            StatementKind::Update => {
                // Slots: table, SET body, FROM body, WHERE body.
                let segments = split(body, &["set", "from", "where"]);
                stmt.table = segments[0].clone();
                stmt.where_clause = segments[3].clone();
            }
            StatementKind::Delete => {
                // Slots: table, USING body, WHERE body, RETURNING body.
                let segments = split(body, &["using", "where", "returning"]);
                stmt.table = segments[0].clone();
                stmt.where_clause = segments[2].clone();
            }
            StatementKind::Bypass => {
                stmt.body = body.to_string();
            }
        }
        stmt
    }
}
