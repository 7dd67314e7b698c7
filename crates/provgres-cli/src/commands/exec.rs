use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use provgres_client::{ExecStatus, PgTransport, QueryOutcome, Session};
use provgres_core::Settings;

pub async fn run(url: &str, sql: Vec<String>, settings: Settings) -> Result<()> {
    tracing::info!(mode = settings.mode.code(), session_id = settings.session_id, "starting session");

    let statements = if sql.is_empty() {
        read_statements_from_stdin()?
    } else {
        sql
    };

    let transport = PgTransport::connect(url)
        .await
        .context("connecting to Postgres")?;
    let mut session = Session::new(settings).context("initializing provenance session")?;

    for sql in &statements {
        let outcome = session
            .dispatch(&transport, sql)
            .await
            .with_context(|| format!("executing: {sql}"))?;
        print_outcome(&outcome);
    }
    Ok(())
}

/// One statement per non-empty line.
fn read_statements_from_stdin() -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for line in BufReader::new(std::io::stdin()).lines() {
        let line = line.context("reading stdin")?;
        if !line.trim().is_empty() {
            statements.push(line);
        }
    }
    Ok(statements)
}

fn print_outcome(outcome: &QueryOutcome) {
    match &outcome.status {
        ExecStatus::Failed(message) => eprintln!("error: {message}"),
        ExecStatus::RowsReturned => {
            println!("{}", outcome.columns.join("\t"));
            for row in &outcome.rows {
                println!("{}", row.join("\t"));
            }
            println!("({} rows)", outcome.ntuples());
        }
        _ => println!("{}", outcome.command_tag),
    }
}
