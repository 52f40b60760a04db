use anyhow::Result;
use std::path::Path;
use street_smarts::{config, query::EstimateParams, server};

use crate::cli::EstimateArgs;

/// Execute the estimate command
///
/// Runs the same pipeline as `/v1/estimate` and prints the result as JSON.
pub async fn execute(config_path: &Path, args: EstimateArgs) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let estimator = server::build_estimator(&cfg).await?;

    let query = to_params(args).into_query(&cfg.estimation)?;
    let result = estimator.estimate(&query).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn to_params(args: EstimateArgs) -> EstimateParams {
    EstimateParams {
        make: args.make,
        model: args.model,
        year: args.year,
        odometer: args.odometer,
        miles_per_year: args.miles_per_year,
        num_years: args.num_years,
        gas_cost: args.gas_cost,
        electrical_cost: args.electrical_cost,
        maintenance_cost_per_year: args.maintenance_cost_per_year,
    }
}
