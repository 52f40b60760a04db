use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use street_smarts::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    // The start command initializes tracing itself once the configured
    // level and format are known; everything else logs warnings to the console.
    let needs_early_tracing = !matches!(args.get_command(), cli::Commands::Start);

    if needs_early_tracing {
        init_tracing("warn", false);
    }

    // Dispatch to appropriate command handler
    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config).await?;
        }
        cli::Commands::Estimate(estimate_args) => {
            commands::estimate::execute(&args.config, estimate_args).await?;
        }
        cli::Commands::Import => {
            commands::import::execute(&args.config).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("street-smarts v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
