use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use street_smarts::config::{self, Config, DataBackend};
use tracing::{info, warn};

/// Print the effective configuration (file merged with `STREET_SMARTS__*` overrides)
pub fn show(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;

    println!("{} {}", "# Effective configuration from".dimmed(), config_path.display());
    print!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

/// Validate the configuration and report referenced files that are missing
///
/// Missing files are reported, not fatal: they may be mounted later.
pub fn validate(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    println!("{}", "✓ Configuration is valid".green());

    let missing = missing_inputs(&cfg);
    for path in &missing {
        warn!(path = %path.display(), "Referenced file does not exist");
        println!("  {} {}", "missing:".yellow(), path.display());
    }

    println!(
        "  backend={:?} horizon={}y miles/year={} max_photos={}",
        cfg.data.backend,
        cfg.estimation.num_years,
        cfg.estimation.miles_per_year,
        cfg.images.max_photos
    );

    info!(missing = missing.len(), "Configuration validated");
    Ok(())
}

/// Files the configured backend reads at startup that are not on disk
fn missing_inputs(cfg: &Config) -> Vec<PathBuf> {
    let mut inputs = vec![cfg.model.path.clone()];
    if cfg.data.backend == DataBackend::Csv {
        inputs.extend(cfg.data.emissions_csv.iter().cloned());
        inputs.extend(cfg.data.photos_csv.iter().cloned());
    }

    inputs.into_iter().filter(|p| !p.exists()).collect()
}
