//! Contributing-row harvesting.
//!
//! Given a provenance result set, find out which base-table rows
//! contributed to it, claim the unclaimed ones for this session, and
//! persist the claimed rows into the capture log together with enough DDL
//! to recreate their tables later.

use provgres_log::LogError;
use provgres_sql::{
    claim_by_rowids, claim_via_view, create_provenance_view, drop_provenance_view,
    split_table_list, view_name, ROWID_COLUMN, ROWID_COLUMN_SUFFIX,
};

use crate::outcome::{ExecStatus, QueryOutcome};
use crate::session::Session;
use crate::transport::QueryTransport;

/// Row ids gathered from one provenance-result column.
#[derive(Debug, PartialEq, Eq)]
pub struct TableRowIds {
    /// Base table the column's ids belong to.
    pub table: String,
    /// Comma-joined row ids, ready for `string_to_array`.
    pub rowids: String,
    /// Index of the carrying column in the result.
    pub column: usize,
}

/// Scan a provenance result for row-id carrier columns and collect their
/// ids per table. Carrier columns are recognized by the `___prov__rowid`
/// suffix; the table name sits between the `prov_<schema>_` prefix and the
/// suffix.
pub fn discover_row_ids(outcome: &QueryOutcome) -> Vec<TableRowIds> {
    let mut found: Vec<TableRowIds> = Vec::new();
    for (column, name) in outcome.columns.iter().enumerate() {
        let Some(stripped) = name.strip_suffix(ROWID_COLUMN_SUFFIX) else {
            continue;
        };
        let table = stripped.splitn(3, '_').nth(2).unwrap_or(stripped);
        // One md5 id plus separator per row.
        let rowids = String::with_capacity(outcome.ntuples() * 33 + 32);
        found.push(TableRowIds {
            table: table.to_string(),
            rowids,
            column,
        });
    }

    for row in 0..outcome.ntuples() {
        for ids in &mut found {
            let id = outcome.value(row, ids.column);
            if id.is_empty() {
                continue;
            }
            if !ids.rowids.is_empty() {
                ids.rowids.push(',');
            }
            ids.rowids.push_str(id);
        }
    }
    found
}

/// Render one result row as an `INSERT INTO <table> VALUES (...)` line.
/// All values are quoted as text; the augmented defaults on replay do not
/// fire because the provenance columns are part of the captured row.
fn row_as_insert(table: &str, outcome: &QueryOutcome, row: usize) -> String {
    let mut values = String::from("(");
    for column in 0..outcome.nfields() {
        if column > 0 {
            values.push_str(", ");
        }
        values.push('\'');
        values.push_str(outcome.value(row, column));
        values.push('\'');
    }
    values.push(')');
    format!("INSERT INTO {table} VALUES {values};")
}

impl Session {
    /// Capture `table`'s DDL into the log, once per session. The DDL is
    /// rebuilt from `information_schema.columns` so it reflects the table
    /// as augmented.
    pub(crate) async fn capture_table_schema(
        &mut self,
        transport: &dyn QueryTransport,
        table: &str,
    ) {
        if self.capture_log().is_none() || !self.remember_captured_table(table) {
            return;
        }
        let sql = format!(
            "select column_name, data_type, character_maximum_length, column_default \
             from INFORMATION_SCHEMA.COLUMNS \
             where table_name = '{table}' and table_schema = 'public'"
        );
        let outcome = match transport.execute(&sql).await {
            Ok(outcome) if outcome.is_ok() => outcome,
            Ok(outcome) => {
                tracing::warn!(table, status = ?outcome.status, "schema introspection rejected");
                return;
            }
            Err(err) => {
                tracing::warn!(table, error = %err, "schema introspection failed");
                return;
            }
        };
        if outcome.ntuples() == 0 {
            tracing::warn!(table, "no columns found, schema not captured");
            return;
        }

        let ddl = build_create_table(table, &outcome);
        if let Err(err) = self.store_table_ddl(&ddl) {
            tracing::warn!(table, error = %err, "failed to capture table schema");
        }
    }

    fn store_table_ddl(&self, ddl: &str) -> Result<(), LogError> {
        match self.capture_log() {
            Some(log) => log.store_table(ddl),
            None => Ok(()),
        }
    }

    /// Write every claimed row to the capture log.
    pub(crate) fn persist_claimed_rows(&self, table: &str, outcome: &QueryOutcome) {
        let Some(log) = self.capture_log() else {
            return;
        };
        let rowid_column = outcome.fnumber(ROWID_COLUMN);
        for row in 0..outcome.ntuples() {
            let insert_sql = row_as_insert(table, outcome, row);
            let rowid = rowid_column.map(|c| outcome.value(row, c)).unwrap_or("");
            if let Err(err) = log.store_row(rowid, table, &insert_sql) {
                tracing::warn!(table, error = %err, "failed to capture claimed row");
            }
        }
    }

    /// Materialize a provenance query as a temp view, claim the contributing
    /// rows of every listed table through it, then drop the view.
    pub(crate) async fn build_view_and_harvest(
        &mut self,
        transport: &dyn QueryTransport,
        tables: &str,
        provenance_sql: &str,
    ) {
        let view = view_name(provenance_sql);
        let create = create_provenance_view(&view, provenance_sql);
        match transport.execute(&create).await {
            Ok(outcome) if outcome.is_ok() => {}
            Ok(outcome) => {
                tracing::warn!(view = %view, status = ?outcome.status, "provenance view rejected");
                return;
            }
            Err(err) => {
                tracing::warn!(view = %view, error = %err, "provenance view failed");
                return;
            }
        }

        for table in split_table_list(tables) {
            self.capture_table_schema(transport, &table).await;
            self.claim_through_view(transport, &table, &view).await;
        }

        if let Err(err) = transport.execute(&drop_provenance_view(&view)).await {
            tracing::warn!(view = %view, error = %err, "failed to drop provenance view");
        }
    }

    /// Claim `table`'s contributing rows through an existing view.
    ///
    /// The claim is a conditional update on `_prov_insertedby = 0`; a
    /// session racing another one simply claims fewer rows.
    async fn claim_through_view(
        &mut self,
        transport: &dyn QueryTransport,
        table: &str,
        view: &str,
    ) {
        let sql = claim_via_view(table, self.session_id(), view);
        match transport.execute(&sql).await {
            Ok(outcome) if outcome.status == ExecStatus::RowsReturned => {
                self.persist_claimed_rows(table, &outcome);
            }
            Ok(outcome) => {
                tracing::warn!(table, status = ?outcome.status, "row claim returned no row set");
            }
            Err(err) => {
                tracing::warn!(table, error = %err, "row claim failed");
            }
        }
    }

    /// Claim the rows surfaced by an UPDATE/DELETE provenance probe.
    pub(crate) async fn harvest_probe(
        &mut self,
        transport: &dyn QueryTransport,
        probe: &QueryOutcome,
    ) {
        for ids in discover_row_ids(probe) {
            if ids.rowids.is_empty() {
                continue;
            }
            self.capture_table_schema(transport, &ids.table).await;
            let sql = claim_by_rowids(&ids.table, self.session_id(), &ids.rowids);
            match transport.execute(&sql).await {
                Ok(outcome) if outcome.status == ExecStatus::RowsReturned => {
                    self.persist_claimed_rows(&ids.table, &outcome);
                }
                Ok(outcome) => {
                    tracing::warn!(table = %ids.table, status = ?outcome.status, "row claim returned no row set");
                }
                Err(err) => {
                    tracing::warn!(table = %ids.table, error = %err, "row claim failed");
                }
            }
        }
    }
}

/// `CREATE TABLE` DDL from an `information_schema.columns` result.
fn build_create_table(table: &str, outcome: &QueryOutcome) -> String {
    let mut ddl = format!("CREATE TABLE {table} (");
    for row in 0..outcome.ntuples() {
        if row > 0 {
            ddl.push_str(", ");
        }
        ddl.push_str(outcome.value(row, 0));
        ddl.push(' ');
        ddl.push_str(outcome.value(row, 1));
        let max_length = outcome.value(row, 2);
        if !max_length.is_empty() {
            ddl.push('(');
            ddl.push_str(max_length);
            ddl.push(')');
        }
        let default = outcome.value(row, 3);
        if !default.is_empty() {
            ddl.push_str(" DEFAULT ");
            ddl.push_str(default);
        }
    }
    ddl.push_str(");");
    ddl
}
