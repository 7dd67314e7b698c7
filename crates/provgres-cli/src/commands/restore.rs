use std::path::Path;

use anyhow::{bail, Context, Result};
use provgres_client::{restore_database, PgConnector, TransportConnector};
use provgres_core::settings::ENV_REPLAY_PATH;
use provgres_core::Settings;

pub async fn run(url: &str, log: Option<&Path>, settings: &Settings) -> Result<()> {
    let path = match log.or(settings.replay_path.as_deref()) {
        Some(path) => path,
        None => bail!("no replay log: pass --log or set {ENV_REPLAY_PATH}"),
    };

    let connector = PgConnector::new(url);
    restore_database(&connector, path)
        .await
        .context("restoring database")?;
    println!("restored {} from {}", connector.target_database(), path.display());
    Ok(())
}
