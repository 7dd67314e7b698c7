//! SQL clause extraction and provenance query assembly.
//!
//! This crate is deliberately *not* a SQL parser. Statements are classified
//! by their leading keyword and carved into segments by scanning for a small
//! set of marker keywords (`from`, `where`, `values`, ...). The trade is
//! explicit: a marker inside a string literal or subquery will mislead the
//! splitter, and that is accepted in exchange for never needing a grammar.
//! Callers depend on the exact segment boundaries this produces, so any
//! upgrade to real tokenization has to preserve them.

pub mod assemble;
pub mod classify;
pub mod schema;
pub mod split;
pub mod statement;

pub use assemble::{ProvenanceQuery, PROVENANCE_VERSION, query_id};
pub use classify::{classify, StatementKind};
pub use schema::{
    alter_table_add_provenance, claim_by_rowids, claim_via_view, create_provenance_view,
    drop_provenance_view, split_table_list, view_name, view_rowid_column, CLAIMED_BY_COLUMN,
    ROWID_COLUMN, ROWID_COLUMN_SUFFIX,
};
pub use split::split;
pub use statement::Statement;
