use anyhow::Result;
use chrono::Utc;
use provgres_core::Settings;
use provgres_sql::{query_id, ProvenanceQuery, Statement};

/// Dry run: show the classification and the derived SQL for one statement
/// without touching a database.
pub fn run(statement: &str, settings: &Settings) -> Result<()> {
    let Some(parsed) = Statement::parse(statement) else {
        println!("unrecognized: statement passes through unchanged");
        return Ok(());
    };

    let timestamp_micros = Utc::now().timestamp_micros();
    let id = query_id(std::process::id(), statement, timestamp_micros);
    let prov = ProvenanceQuery::assemble(parsed, id, settings.session_id, timestamp_micros);

    println!("kind:     {:?}", prov.statement.kind);
    for (label, segment) in [
        ("table", &prov.statement.table),
        ("fields", &prov.statement.fields),
        ("where", &prov.statement.where_clause),
        ("values", &prov.statement.values),
        ("return", &prov.statement.returning),
    ] {
        if !segment.is_empty() {
            println!("{label:<8} {segment}");
        }
    }
    println!("query id: {id}");
    match &prov.derived_sql {
        Some(sql) => println!("derived:  {sql}"),
        None => println!("derived:  (none, body is forwarded verbatim)"),
    }
    Ok(())
}
