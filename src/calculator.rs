//! Cost-to-own and CO₂ estimation
//!
//! [`Estimator`] runs the full pipeline for one [`VehicleQuery`]: match the
//! model name, read EPA figures, derive fuel/CO₂ metrics, predict the price
//! and resolve photos. The formulas are free functions so they can be checked
//! in isolation.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::EstimateError;
use crate::images::ImageResolver;
use crate::matcher::{match_model, CanonicalModelIndex};
use crate::metrics;
use crate::predictor::{PricePredictor, VehicleFeatures};
use crate::query::{OwnershipAssumptions, VehicleQuery};
use crate::reference::ReferenceData;

/// CO₂ absorbed by one tree in a year, in kilograms
pub const TREE_ABSORPTION_KG_PER_YEAR: f64 = 21.7724;

const FIRE: char = '\u{1F525}';
const TREE: char = '\u{1F332}';
const GRAPH_WIDTH: usize = 10;
const GRAPH_ROWS: usize = 5;

/// Everything computed for one estimate
#[derive(Debug, Clone, Serialize)]
pub struct EstimationResult {
    pub request_id: Uuid,
    pub make: String,
    pub model: String,
    pub canonical_model: String,
    pub year: i32,
    /// Year whose photos were returned; `null` when the placeholder was used
    pub photo_year: Option<i32>,
    pub predicted_price: f64,
    pub combined_mpg: f64,
    pub co2_grams_per_mile: f64,
    pub co2_kg: f64,
    pub fuel_cost: f64,
    pub maintenance_cost: f64,
    pub cost_to_own: f64,
    pub tree_offset: f64,
    pub trees_to_offset: u64,
    pub co2_graph: Vec<String>,
    pub photos: Vec<String>,
    pub assumptions: OwnershipAssumptions,
}

/// CO₂ emitted over the horizon, in kilograms
pub fn co2_over_years(co2_grams_per_mile: f64, miles_per_year: u32, years: u32) -> f64 {
    co2_grams_per_mile * miles_per_year as f64 * years as f64 / 1000.0
}

/// Fuel spend over the horizon
pub fn fuel_cost(
    miles_per_year: u32,
    combined_mpg: f64,
    gas_cost: f64,
    years: u32,
) -> Result<f64, EstimateError> {
    if combined_mpg == 0.0 {
        return Err(EstimateError::DivisionByZero("combined mpg is zero"));
    }
    Ok(miles_per_year as f64 / combined_mpg * gas_cost * years as f64)
}

/// Fuel + maintenance + purchase price
///
/// Maintenance is added once, not per year of the horizon.
pub fn cost_to_own(fuel_cost: f64, maintenance_cost_per_year: f64, predicted_price: f64) -> f64 {
    fuel_cost + maintenance_cost_per_year + predicted_price
}

/// Trees needed to absorb `co2_kg` over `years`
pub fn tree_offset(co2_kg: f64, years: u32) -> Result<f64, EstimateError> {
    if years == 0 {
        return Err(EstimateError::DivisionByZero("ownership horizon is zero years"));
    }
    Ok(co2_kg / (TREE_ABSORPTION_KG_PER_YEAR * years as f64))
}

/// Rows of fire and tree emoji: one fire per hundred trees, padded with trees to ten
///
/// A thousand trees or more fills every cell with fire.
pub fn co2_graph(trees_to_offset: u64) -> Vec<String> {
    let fires = (trees_to_offset / 100).min(GRAPH_WIDTH as u64) as usize;
    let trees = GRAPH_WIDTH - fires;

    let mut row = String::new();
    row.extend(std::iter::repeat(FIRE).take(fires));
    row.extend(std::iter::repeat(TREE).take(trees));

    vec![row; GRAPH_ROWS]
}

/// Runs estimates against shared, read-only collaborators
pub struct Estimator {
    reference: Arc<dyn ReferenceData>,
    index: Arc<CanonicalModelIndex>,
    predictor: Arc<dyn PricePredictor>,
    images: ImageResolver,
}

impl Estimator {
    pub fn new(
        reference: Arc<dyn ReferenceData>,
        index: Arc<CanonicalModelIndex>,
        predictor: Arc<dyn PricePredictor>,
        images: ImageResolver,
    ) -> Self {
        Self {
            reference,
            index,
            predictor,
            images,
        }
    }

    pub fn index(&self) -> &CanonicalModelIndex {
        &self.index
    }

    /// Estimate cost-to-own and CO₂ for one vehicle
    pub async fn estimate(&self, query: &VehicleQuery) -> Result<EstimationResult, EstimateError> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "estimate",
            %request_id,
            make = query.make(),
            model = query.model(),
            year = query.year()
        );

        let started = Instant::now();
        let result = self.run(request_id, query).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(EstimateError::NoEmissionData { .. }) => "no_emission_data",
            Err(EstimateError::DivisionByZero(_)) => "division_by_zero",
            Err(_) => "error",
        };
        metrics::record_estimate(outcome, started.elapsed());

        result
    }

    async fn run(&self, request_id: Uuid, query: &VehicleQuery) -> Result<EstimationResult, EstimateError> {
        let assumptions = query.assumptions();

        let canonical_model = match_model(query.model(), &self.index)?.to_string();

        // EPA names differ from listing names, so the emission key uses the model as given
        let figures = self
            .reference
            .lookup_emission(query.make(), query.model(), query.year())
            .await?
            .ok_or_else(|| EstimateError::NoEmissionData {
                make: query.make().to_string(),
                model: query.model().to_string(),
                year: query.year(),
            })?;

        let co2_kg = co2_over_years(
            figures.co2_grams_per_mile,
            assumptions.miles_per_year,
            assumptions.num_years,
        );
        let fuel = fuel_cost(
            assumptions.miles_per_year,
            figures.combined_mpg,
            assumptions.gas_cost,
            assumptions.num_years,
        )?;

        let predicted_price = self.predictor.predict(&VehicleFeatures {
            year: query.year(),
            manufacturer: query.manufacturer(),
            model: canonical_model.clone(),
            odometer: query.odometer(),
        })?;

        let total = cost_to_own(fuel, assumptions.maintenance_cost_per_year, predicted_price);
        let offset = tree_offset(co2_kg, assumptions.num_years)?;
        let trees_to_offset = offset.round().max(0.0) as u64;

        let photos = self
            .images
            .resolve(self.reference.as_ref(), &canonical_model, query.year())
            .await?;

        info!(
            canonical_model = %canonical_model,
            predicted_price,
            cost_to_own = total,
            co2_kg,
            photo_year = ?photos.year,
            "Estimate complete"
        );

        Ok(EstimationResult {
            request_id,
            make: query.make().to_string(),
            model: query.model().to_string(),
            canonical_model,
            year: query.year(),
            photo_year: photos.year,
            predicted_price,
            combined_mpg: figures.combined_mpg,
            co2_grams_per_mile: figures.co2_grams_per_mile,
            co2_kg,
            fuel_cost: fuel,
            maintenance_cost: assumptions.maintenance_cost_per_year,
            cost_to_own: total,
            tree_offset: offset,
            trees_to_offset,
            co2_graph: co2_graph(trees_to_offset),
            photos: photos.urls,
            assumptions: assumptions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::UrlProbe;
    use crate::reference::{EmissionRow, PhotoRow, ReferenceTables};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct AlwaysUp;

    #[async_trait]
    impl UrlProbe for AlwaysUp {
        async fn is_reachable(&self, _url: &str) -> bool {
            true
        }
    }

    /// Returns a fixed price and remembers what it was asked
    struct FixedPrice {
        price: f64,
        seen: Mutex<Vec<VehicleFeatures>>,
    }

    impl PricePredictor for FixedPrice {
        fn predict(&self, features: &VehicleFeatures) -> Result<f64, EstimateError> {
            self.seen.lock().unwrap().push(features.clone());
            Ok(self.price)
        }
    }

    fn estimator(mpg: f64, predictor: Arc<FixedPrice>) -> Estimator {
        let reference = ReferenceTables::from_rows(
            vec![EmissionRow {
                make: "Ford".to_string(),
                model: "F150 Pickup 4WD".to_string(),
                year: 2005,
                comb08: mpg,
                co2_tailpipe_gpm: 523.0,
            }],
            vec![
                PhotoRow {
                    model: "f-150".to_string(),
                    year: 2005,
                    image_url: "https://img/f150.jpg".to_string(),
                },
                PhotoRow {
                    model: "civic".to_string(),
                    year: 2010,
                    image_url: "https://img/civic.jpg".to_string(),
                },
            ],
        );
        let index = CanonicalModelIndex::new(vec!["f-150".to_string(), "civic".to_string()]).unwrap();

        Estimator::new(
            Arc::new(reference),
            Arc::new(index),
            predictor,
            ImageResolver::new(Arc::new(AlwaysUp), 4, "https://img/none.png"),
        )
    }

    fn fixed_price(price: f64) -> Arc<FixedPrice> {
        Arc::new(FixedPrice {
            price,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn f150_query() -> VehicleQuery {
        VehicleQuery::new(
            "Ford",
            "F150 Pickup 4WD",
            2005,
            Some(99_999),
            OwnershipAssumptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_co2_scales_linearly_with_years() {
        for years in 1..=10 {
            assert_eq!(
                co2_over_years(523.0, 15_000, 2 * years),
                2.0 * co2_over_years(523.0, 15_000, years)
            );
        }
    }

    #[test]
    fn test_reference_scenario_formulas() {
        assert_eq!(co2_over_years(523.0, 15_000, 5), 39_225.0);

        let fuel = fuel_cost(15_000, 17.0, 3.0, 5).unwrap();
        assert!((fuel - 13_235.29).abs() < 0.01);

        let offset = tree_offset(39_225.0, 5).unwrap();
        assert!((offset - 360.318).abs() < 0.001);
        assert_eq!(offset.round(), 360.0);
    }

    #[test]
    fn test_zero_mpg_is_division_by_zero() {
        let err = fuel_cost(15_000, 0.0, 3.0, 5).unwrap_err();
        assert!(matches!(err, EstimateError::DivisionByZero(_)));
    }

    #[test]
    fn test_maintenance_added_once() {
        assert_eq!(cost_to_own(100.0, 1000.0, 5000.0), 6100.0);
    }

    #[test]
    fn test_co2_graph_shape() {
        let graph = co2_graph(360);
        assert_eq!(graph.len(), 5);
        assert_eq!(graph[0].chars().filter(|c| *c == FIRE).count(), 3);
        assert_eq!(graph[0].chars().filter(|c| *c == TREE).count(), 7);
        assert!(graph.iter().all(|row| row == &graph[0]));

        // More than a thousand trees saturates to all fire
        let graph = co2_graph(1_500);
        assert_eq!(graph[0].chars().count(), GRAPH_WIDTH);
        assert!(graph[0].chars().all(|c| c == FIRE));

        let graph = co2_graph(u64::MAX);
        assert_eq!(graph[0].chars().count(), GRAPH_WIDTH);
    }

    #[tokio::test]
    async fn test_estimate_uses_canonical_model_for_price_and_photos() {
        let predictor = fixed_price(6_500.0);
        let estimator = estimator(17.0, predictor.clone());

        let result = estimator.estimate(&f150_query()).await.unwrap();

        assert_eq!(result.canonical_model, "f-150");
        assert_eq!(result.photos, vec!["https://img/f150.jpg"]);
        assert_eq!(result.photo_year, Some(2005));
        assert_eq!(result.co2_kg, 39_225.0);
        assert_eq!(result.trees_to_offset, 360);
        assert!((result.cost_to_own - (13_235.294 + 1_000.0 + 6_500.0)).abs() < 0.01);

        let seen = predictor.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            VehicleFeatures {
                year: 2005,
                manufacturer: "ford".to_string(),
                model: "f-150".to_string(),
                odometer: Some(99_999),
            }
        );
    }

    #[tokio::test]
    async fn test_estimate_without_emission_row() {
        let estimator = estimator(17.0, fixed_price(1.0));
        let query = VehicleQuery::new("Ford", "Model T", 1925, None, OwnershipAssumptions::default()).unwrap();

        let err = estimator.estimate(&query).await.unwrap_err();
        assert!(matches!(err, EstimateError::NoEmissionData { year: 1925, .. }));
    }

    #[tokio::test]
    async fn test_estimate_zero_mpg_never_predicts() {
        let predictor = fixed_price(1.0);
        let estimator = estimator(0.0, predictor.clone());

        let err = estimator.estimate(&f150_query()).await.unwrap_err();
        assert!(matches!(err, EstimateError::DivisionByZero(_)));
        assert!(predictor.seen.lock().unwrap().is_empty());
    }
}
