use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use super::{EmissionFigures, EmissionRow, PhotoRow, ReferenceData};
use crate::error::EstimateError;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    mpg: f64,
    co2: f64,
    count: u32,
}

/// In-memory reference tables
///
/// Emission rows are pre-aggregated per key at load time; photo rows keep
/// their file order so the image resolver sees the same ordering as the source.
#[derive(Debug, Default)]
pub struct ReferenceTables {
    emissions: HashMap<(String, String, i32), Totals>,
    photos: HashMap<(String, i32), Vec<String>>,
    models: BTreeSet<String>,
}

impl ReferenceTables {
    pub fn from_rows(emissions: Vec<EmissionRow>, photos: Vec<PhotoRow>) -> Self {
        let mut tables = Self::default();

        for row in emissions {
            let totals = tables
                .emissions
                .entry((row.make, row.model, row.year))
                .or_default();
            totals.mpg += row.comb08;
            totals.co2 += row.co2_tailpipe_gpm;
            totals.count += 1;
        }

        for row in photos {
            tables.models.insert(row.model.clone());
            tables
                .photos
                .entry((row.model, row.year))
                .or_default()
                .push(row.image_url);
        }

        tables
    }

    /// Load both tables from CSV files
    pub fn load(emissions_csv: &Path, photos_csv: &Path) -> Result<Self, EstimateError> {
        let emissions = load_emission_rows(emissions_csv)?;
        let photos = load_photo_rows(photos_csv)?;

        info!(
            emission_rows = emissions.len(),
            photo_rows = photos.len(),
            "Loaded reference tables from CSV"
        );

        Ok(Self::from_rows(emissions, photos))
    }
}

/// Read the EPA table, rejecting rows with unusable figures
pub fn load_emission_rows(path: &Path) -> Result<Vec<EmissionRow>, EstimateError> {
    let rows: Vec<EmissionRow> = read_csv(path)?;
    for (line, row) in rows.iter().enumerate() {
        row.check().map_err(|e| {
            EstimateError::Configuration(format!("Row {} in {}: {}", line + 2, path.display(), e))
        })?;
    }
    Ok(rows)
}

pub fn load_photo_rows(path: &Path) -> Result<Vec<PhotoRow>, EstimateError> {
    read_csv(path)
}

fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, EstimateError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        EstimateError::Configuration(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize().enumerate() {
        let row: T = record.map_err(|e| {
            EstimateError::Configuration(format!(
                "Invalid row {} in {}: {}",
                line + 2,
                path.display(),
                e
            ))
        })?;
        rows.push(row);
    }

    Ok(rows)
}

#[async_trait]
impl ReferenceData for ReferenceTables {
    async fn lookup_emission(
        &self,
        make: &str,
        model: &str,
        year: i32,
    ) -> Result<Option<EmissionFigures>, EstimateError> {
        let key = (make.to_string(), model.to_string(), year);
        Ok(self
            .emissions
            .get(&key)
            .map(|t| EmissionFigures {
                combined_mpg: t.mpg / t.count as f64,
                co2_grams_per_mile: t.co2 / t.count as f64,
            })
            .filter(EmissionFigures::is_usable))
    }

    async fn lookup_photos(&self, model: &str, year: i32) -> Result<Vec<String>, EstimateError> {
        Ok(self
            .photos
            .get(&(model.to_string(), year))
            .cloned()
            .unwrap_or_default())
    }

    async fn model_names(&self) -> Result<Vec<String>, EstimateError> {
        Ok(self.models.iter().cloned().collect())
    }
}
