//! Price prediction behind a capability trait
//!
//! The estimator only needs `predict(features) -> price`. [`ForestModel`] is the
//! bundled implementation, loaded once at startup from a JSON artifact.

pub mod forest;

pub use forest::ForestModel;

use crate::error::EstimateError;

/// Feature columns in the order the price model consumes them
pub const FEATURE_COLUMNS: [&str; 4] = ["year", "manufacturer", "model", "odometer"];

/// Inputs for one price prediction
///
/// `model` must be the canonical model name, never the raw user string.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFeatures {
    pub year: i32,
    pub manufacturer: String,
    pub model: String,
    pub odometer: Option<u32>,
}

pub trait PricePredictor: Send + Sync {
    fn predict(&self, features: &VehicleFeatures) -> Result<f64, EstimateError>;
}
