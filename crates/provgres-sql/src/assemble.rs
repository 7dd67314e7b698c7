//! Derived provenance query assembly.

use provgres_core::djb2;

use crate::classify::StatementKind;
use crate::statement::Statement;

/// Record version stamped on captured statements. Always 1 for now; reserved
/// for log-format evolution.
pub const PROVENANCE_VERSION: i32 = 1;

/// Hash identifying one original statement: DJB2 of `"{pid}.{sql}.{ts}"`.
///
/// The id ends up embedded in SQL as a bare decimal literal, hence the
/// non-negative hash.
pub fn query_id(pid: u32, sql: &str, timestamp_micros: i64) -> i64 {
    djb2(&format!("{pid}.{sql}.{timestamp_micros}"))
}

/// One original statement rewritten for provenance capture.
///
/// `derived_sql` is `None` for BYPASS (nothing is assembled; the dispatcher
/// forwards the body) and for statement families with no derived form.
#[derive(Debug, Clone)]
pub struct ProvenanceQuery {
    pub query_id: i64,
    pub version: i32,
    pub timestamp_micros: i64,
    pub statement: Statement,
    pub derived_sql: Option<String>,
}

impl ProvenanceQuery {
    /// Assemble the derived SQL for a parsed statement.
    ///
    /// - SELECT becomes a `SELECT PROVENANCE` over the same clauses; the
    ///   `PROVENANCE` keyword is consumed by the augmented backend grammar
    ///   and makes the result carry provenance columns.
    /// - INSERT reuses the original values list and appends the query id,
    ///   the session id and `now()` before the closing parenthesis.
    /// - UPDATE and DELETE become a `SELECT PROVENANCE *` probe over the
    ///   target table; the original statement still runs afterwards, the
    ///   probe only exists so the rows about to be touched can be
    ///   identified first.
    pub fn assemble(
        statement: Statement,
        query_id: i64,
        session_id: i32,
        timestamp_micros: i64,
    ) -> ProvenanceQuery {
        let derived_sql = match statement.kind {
            StatementKind::Select => Some(provenance_select(
                &statement.fields,
                &statement.table,
                &statement.where_clause,
            )),
            StatementKind::Insert => Some(provenance_insert(&statement, query_id, session_id)),
            StatementKind::Update | StatementKind::Delete => Some(provenance_select(
                "*",
                &statement.table,
                &statement.where_clause,
            )),
            StatementKind::Bypass => None,
        };

        ProvenanceQuery {
            query_id,
            version: PROVENANCE_VERSION,
            timestamp_micros,
            statement,
            derived_sql,
        }
    }
}

fn provenance_select(fields: &str, table: &str, where_clause: &str) -> String {
    let mut sql = format!("SELECT PROVENANCE {fields} FROM {table}");
    if !where_clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }
    sql
}

fn provenance_insert(statement: &Statement, query_id: i64, session_id: i32) -> String {
    // Drop the closing parenthesis of the original values list so the
    // bookkeeping values slot in before it.
    let values = statement
        .values
        .strip_suffix(')')
        .unwrap_or(&statement.values);
    let mut sql = format!(
        "INSERT INTO {} VALUES {}, {}, {}, now())",
        statement.table, values, query_id, session_id
    );
    if !statement.returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&statement.returning);
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assembled(sql: &str, query_id: i64, session_id: i32) -> Option<String> {
        let stmt = Statement::parse(sql)?;
        ProvenanceQuery::assemble(stmt, query_id, session_id, 0).derived_sql
    }

    #[test]
    fn select_gains_the_provenance_keyword() {
        assert_eq!(
            assembled("SELECT x FROM t WHERE x>1", 1, 2).unwrap(),
            "SELECT PROVENANCE x FROM t WHERE x>1"
        );
        assert_eq!(
            assembled("SELECT x, y FROM t", 1, 2).unwrap(),
            "SELECT PROVENANCE x, y FROM t"
        );
    }

    #[test]
    fn insert_appends_bookkeeping_values() {
        assert_eq!(
            assembled("INSERT INTO orders VALUES (1,2,3)", 42, 7).unwrap(),
            "INSERT INTO orders VALUES (1,2,3, 42, 7, now())"
        );
    }

    #[test]
    fn insert_keeps_returning_clause() {
        assert_eq!(
            assembled("INSERT INTO orders VALUES (1,2,3) RETURNING id", 42, 7).unwrap(),
            "INSERT INTO orders VALUES (1,2,3, 42, 7, now()) RETURNING id"
        );
    }

    #[test]
    fn update_and_delete_become_probes() {
        assert_eq!(
            assembled("UPDATE t SET x=1 WHERE id=2", 1, 2).unwrap(),
            "SELECT PROVENANCE * FROM t WHERE id=2"
        );
        assert_eq!(
            assembled("DELETE FROM t WHERE id=2", 1, 2).unwrap(),
            "SELECT PROVENANCE * FROM t WHERE id=2"
        );
        assert_eq!(
            assembled("DELETE FROM t", 1, 2).unwrap(),
            "SELECT PROVENANCE * FROM t"
        );
    }

    #[test]
    fn bypass_assembles_nothing() {
        assert_eq!(assembled("BYPASS DROP TABLE t", 1, 2), None);
    }

    #[test]
    fn query_id_is_deterministic_and_non_negative() {
        let a = query_id(1234, "INSERT INTO t VALUES (1)", 1_700_000_000_000_000);
        let b = query_id(1234, "INSERT INTO t VALUES (1)", 1_700_000_000_000_000);
        assert_eq!(a, b);
        assert!(a >= 0);
        assert_ne!(a, query_id(1235, "INSERT INTO t VALUES (1)", 1_700_000_000_000_000));
    }
}
