use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use street_smarts::{
    config,
    reference::{memory, SqliteReferenceStore},
};
use tracing::info;

/// Execute the import command
///
/// Replaces the contents of the SQLite reference database with the rows of
/// the configured CSV files.
pub async fn execute(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let data = &cfg.data;

    let emissions_csv = data
        .emissions_csv
        .as_deref()
        .context("import requires data.emissions_csv")?;
    let photos_csv = data
        .photos_csv
        .as_deref()
        .context("import requires data.photos_csv")?;
    let database_url = data
        .database_url
        .as_deref()
        .context("import requires data.database_url")?;

    println!("{}", "Reading CSV reference tables...".yellow());
    let emissions = memory::load_emission_rows(emissions_csv)?;
    let photos = memory::load_photo_rows(photos_csv)?;

    let store = SqliteReferenceStore::create(database_url, data.max_connections).await?;
    store.import(&emissions, &photos).await?;

    println!(
        "{} {} emission rows, {} photo rows into {}",
        "✓ Imported".green(),
        emissions.len(),
        photos.len(),
        database_url
    );
    info!(database_url, "Reference import finished");
    Ok(())
}
