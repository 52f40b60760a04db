use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "street-smarts", version, about = "Used-vehicle cost-to-own and CO₂ estimator")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the estimation server (default)
    Start,

    /// Load configuration, reference data and the price model, then print a summary
    Test,

    /// Run a single estimate and print the result as JSON
    Estimate(EstimateArgs),

    /// Load the CSV reference tables into the SQLite database
    Import,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EstimateArgs {
    /// Manufacturer as listed in the EPA table (e.g. "Ford")
    #[arg(long)]
    pub make: String,

    /// Free-text model name (e.g. "F150 Pickup 4WD")
    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub year: i32,

    #[arg(long)]
    pub odometer: Option<u32>,

    #[arg(long)]
    pub miles_per_year: Option<u32>,

    #[arg(long)]
    pub num_years: Option<u32>,

    #[arg(long)]
    pub gas_cost: Option<f64>,

    /// Price per kWh; echoed in the result, not used by any formula
    #[arg(long)]
    pub electrical_cost: Option<f64>,

    #[arg(long)]
    pub maintenance_cost_per_year: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}
