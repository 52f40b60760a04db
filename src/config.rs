use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::query::OwnershipAssumptions;

const DEFAULT_PLACEHOLDER_URL: &str =
    "https://raw.githubusercontent.com/Lambda-School-Labs/street-smarts-ds/master/data/noImage_large.png";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub estimation: OwnershipAssumptions,
    #[serde(default)]
    pub images: ImagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBackend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    pub backend: DataBackend,
    /// EPA table (csv backend, and source for `import`)
    pub emissions_csv: Option<PathBuf>,
    /// Listing photo table (csv backend, and source for `import`)
    pub photos_csv: Option<PathBuf>,
    /// sqlx URL, e.g. `sqlite:./data/reference.db`
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Price model artifact (JSON)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    /// Photos probed per year tier
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_photos: default_max_photos(),
            probe_timeout_seconds: default_probe_timeout(),
            placeholder_url: default_placeholder_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_photos() -> usize {
    4
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_placeholder_url() -> String {
    DEFAULT_PLACEHOLDER_URL.to_string()
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("STREET_SMARTS").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!(
            "server.log_format must be 'text' or 'json', got '{}'",
            cfg.server.log_format
        );
    }

    match cfg.data.backend {
        DataBackend::Csv => {
            if cfg.data.emissions_csv.is_none() || cfg.data.photos_csv.is_none() {
                anyhow::bail!("The csv backend requires data.emissions_csv and data.photos_csv");
            }
        }
        DataBackend::Sqlite => {
            if cfg.data.database_url.is_none() {
                anyhow::bail!("The sqlite backend requires data.database_url");
            }
        }
    }

    if cfg.data.max_connections == 0 {
        anyhow::bail!("data.max_connections must be at least 1");
    }

    if !(1..=10).contains(&cfg.images.max_photos) {
        anyhow::bail!(
            "images.max_photos must be between 1 and 10, got {}",
            cfg.images.max_photos
        );
    }

    if cfg.images.probe_timeout_seconds == 0 {
        anyhow::bail!("images.probe_timeout_seconds must be at least 1");
    }

    if cfg.images.placeholder_url.is_empty() {
        anyhow::bail!("images.placeholder_url cannot be empty");
    }

    cfg.estimation
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid [estimation] defaults: {}", e))?;

    Ok(())
}
