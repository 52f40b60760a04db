use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use street_smarts::{config, init_tracing, server};
use tracing::info;

/// Execute the start command
///
/// This will:
/// 1. Load configuration
/// 2. Initialize tracing with the configured level and format
/// 3. Start the server (blocks until shutdown)
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting street-smarts...".green());

    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, cfg.server.log_format == "json");

    info!(config = %config_path.display(), "Configuration loaded");

    server::start_server(cfg).await?;

    Ok(())
}
