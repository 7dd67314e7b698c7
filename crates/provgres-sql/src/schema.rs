//! Provenance schema DDL and claim statements.
//!
//! The hidden columns added to every tracked table:
//! `_prov_p` (random source marker), `_prov_insertedby` (claiming session,
//! 0 = unclaimed), `_prov_v` (row timestamp), `_prov_rowid` (unique random
//! row id). The backend's augmented grammar exposes the row id of table `t`
//! in provenance results as `prov_public_t___prov__rowid`.

use provgres_core::djb2;

/// Column claimed rows are stamped into; 0 means unclaimed.
pub const CLAIMED_BY_COLUMN: &str = "_prov_insertedby";

/// Unique row identifier column added to every tracked table.
pub const ROWID_COLUMN: &str = "_prov_rowid";

/// Suffix marking a provenance-result column as a row-id carrier.
pub const ROWID_COLUMN_SUFFIX: &str = "___prov__rowid";

/// ALTER TABLE statement adding the provenance columns to one table.
pub fn alter_table_add_provenance(table: &str) -> String {
    format!(
        "ALTER TABLE {table} \
         ADD COLUMN _prov_p varchar(40) DEFAULT md5(random()::text), \
         ADD COLUMN _prov_insertedby integer DEFAULT 0, \
         ADD COLUMN _prov_v timestamp DEFAULT now(), \
         ADD COLUMN _prov_rowid varchar(32) DEFAULT md5(random()::text), \
         ADD UNIQUE (_prov_rowid);"
    )
}

/// Deterministic view name for a provenance query: repeated identical
/// queries within a session reuse the same name.
pub fn view_name(provenance_sql: &str) -> String {
    format!("_prov_view_{}", djb2(provenance_sql))
}

pub fn create_provenance_view(view: &str, provenance_sql: &str) -> String {
    format!("CREATE OR REPLACE TEMP VIEW {view} AS {provenance_sql}")
}

pub fn drop_provenance_view(view: &str) -> String {
    format!("DROP VIEW IF EXISTS {view}")
}

/// Name of the view column carrying `table`'s row ids.
pub fn view_rowid_column(table: &str) -> String {
    format!("prov_public_{table}{ROWID_COLUMN_SUFFIX}")
}

/// Claim, via a provenance view, every not-yet-claimed row of `table` that
/// contributed to the view, returning the claimed rows.
///
/// The `_prov_insertedby = 0` guard is the sole concurrency control: of two
/// sessions racing on a row, exactly one conditional update matches; the
/// loser claims nothing and that is not an error.
pub fn claim_via_view(table: &str, session_id: i32, view: &str) -> String {
    format!(
        "UPDATE {table} SET {CLAIMED_BY_COLUMN} = {session_id} FROM {view} \
         WHERE {table}.{ROWID_COLUMN} = {view}.{view_col} \
         AND {table}.{CLAIMED_BY_COLUMN} = 0 RETURNING {table}.*;",
        view_col = view_rowid_column(table),
    )
}

/// Claim rows of `table` by an explicit comma-joined row-id list.
pub fn claim_by_rowids(table: &str, session_id: i32, rowids: &str) -> String {
    format!(
        "UPDATE {table} SET {CLAIMED_BY_COLUMN} = {session_id} \
         WHERE {CLAIMED_BY_COLUMN} = 0 \
         AND {ROWID_COLUMN} = any(string_to_array('{rowids}',',')) \
         RETURNING *;"
    )
}

/// Tokenize a free-form table list: tables separated by commas and/or
/// spaces, arbitrary surrounding whitespace. Each comma-separated chunk
/// contributes its first whitespace-delimited token, so aliases and join
/// noise after a table name are ignored.
pub fn split_table_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|chunk| chunk.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
