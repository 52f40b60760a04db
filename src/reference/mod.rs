//! Read-only reference data: EPA emission figures and listing photos
//!
//! Two providers implement [`ReferenceData`]:
//! - [`ReferenceTables`]: in-memory tables loaded from CSV files
//! - [`SqliteReferenceStore`]: SQLite database queried with `AVG(...)` aggregation

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EstimateError;

pub use memory::ReferenceTables;
pub use sqlite::SqliteReferenceStore;

/// Averaged EPA figures for one (make, model, year)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionFigures {
    pub combined_mpg: f64,
    pub co2_grams_per_mile: f64,
}

impl EmissionFigures {
    /// Both figures are finite and non-negative
    pub fn is_usable(&self) -> bool {
        [self.combined_mpg, self.co2_grams_per_mile]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// One EPA row as it appears in the source table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmissionRow {
    pub make: String,
    pub model: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    pub comb08: f64,
    #[serde(rename = "co2TailpipeGpm")]
    pub co2_tailpipe_gpm: f64,
}

impl EmissionRow {
    /// Reject figures no estimate can be computed from
    pub fn check(&self) -> Result<(), String> {
        for (column, value) in [("comb08", self.comb08), ("co2TailpipeGpm", self.co2_tailpipe_gpm)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{} {} ({}): {} must be a non-negative number, got {}",
                    self.make, self.model, self.year, column, value
                ));
            }
        }
        Ok(())
    }
}

/// One listing photo
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoRow {
    pub model: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    pub image_url: String,
}

/// Lookups the estimator needs from the reference data
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Average emission figures over every row matching the key exactly
    ///
    /// Averages that are negative or not finite are reported as missing.
    async fn lookup_emission(
        &self,
        make: &str,
        model: &str,
        year: i32,
    ) -> Result<Option<EmissionFigures>, EstimateError>;

    /// Photo URLs for a model/year in stored order
    async fn lookup_photos(&self, model: &str, year: i32) -> Result<Vec<String>, EstimateError>;

    /// Distinct model names present in the photo table
    async fn model_names(&self) -> Result<Vec<String>, EstimateError>;
}

/// Accept `2005` as well as `2005.0`; listing exports often store years as floats.
fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.fract() != 0.0 || raw < i32::MIN as f64 || raw > i32::MAX as f64 {
        return Err(serde::de::Error::custom(format!("invalid year: {}", raw)));
    }
    Ok(raw as i32)
}
