use serde::{Deserialize, Serialize};

use crate::error::EstimateError;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;
const MAX_MILES_PER_YEAR: u32 = 200_000;
const MAX_NUM_YEARS: u32 = 50;

/// Ownership assumptions applied to every estimate unless a request overrides them
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OwnershipAssumptions {
    #[serde(default = "default_miles_per_year")]
    pub miles_per_year: u32,

    /// Ownership horizon in years
    #[serde(default = "default_num_years")]
    pub num_years: u32,

    /// Fuel price per gallon
    #[serde(default = "default_gas_cost")]
    pub gas_cost: f64,

    /// Price per kWh. Reserved for an electric-vehicle comparison, not used in any formula yet.
    #[serde(default = "default_electrical_cost")]
    pub electrical_cost: f64,

    #[serde(default = "default_maintenance_cost_per_year")]
    pub maintenance_cost_per_year: f64,
}

impl Default for OwnershipAssumptions {
    fn default() -> Self {
        Self {
            miles_per_year: default_miles_per_year(),
            num_years: default_num_years(),
            gas_cost: default_gas_cost(),
            electrical_cost: default_electrical_cost(),
            maintenance_cost_per_year: default_maintenance_cost_per_year(),
        }
    }
}

fn default_miles_per_year() -> u32 {
    15_000
}

fn default_num_years() -> u32 {
    5
}

fn default_gas_cost() -> f64 {
    3.0
}

fn default_electrical_cost() -> f64 {
    0.12
}

fn default_maintenance_cost_per_year() -> f64 {
    1000.0
}

impl OwnershipAssumptions {
    pub fn validate(&self) -> Result<(), EstimateError> {
        if !(1..=MAX_MILES_PER_YEAR).contains(&self.miles_per_year) {
            return Err(EstimateError::InvalidQuery(format!(
                "miles_per_year must be between 1 and {}, got {}",
                MAX_MILES_PER_YEAR, self.miles_per_year
            )));
        }
        if !(1..=MAX_NUM_YEARS).contains(&self.num_years) {
            return Err(EstimateError::InvalidQuery(format!(
                "num_years must be between 1 and {}, got {}",
                MAX_NUM_YEARS, self.num_years
            )));
        }

        for (name, value) in [
            ("gas_cost", self.gas_cost),
            ("electrical_cost", self.electrical_cost),
            ("maintenance_cost_per_year", self.maintenance_cost_per_year),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimateError::InvalidQuery(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Query-string parameters accepted by `/v1/estimate`
///
/// Every assumption is optional and falls back to the configured defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateParams {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub odometer: Option<u32>,
    pub miles_per_year: Option<u32>,
    pub num_years: Option<u32>,
    pub gas_cost: Option<f64>,
    pub electrical_cost: Option<f64>,
    pub maintenance_cost_per_year: Option<f64>,
}

impl EstimateParams {
    /// Merge with defaults and validate
    pub fn into_query(self, defaults: &OwnershipAssumptions) -> Result<VehicleQuery, EstimateError> {
        let assumptions = OwnershipAssumptions {
            miles_per_year: self.miles_per_year.unwrap_or(defaults.miles_per_year),
            num_years: self.num_years.unwrap_or(defaults.num_years),
            gas_cost: self.gas_cost.unwrap_or(defaults.gas_cost),
            electrical_cost: self.electrical_cost.unwrap_or(defaults.electrical_cost),
            maintenance_cost_per_year: self
                .maintenance_cost_per_year
                .unwrap_or(defaults.maintenance_cost_per_year),
        };

        VehicleQuery::new(self.make, self.model, self.year, self.odometer, assumptions)
    }
}

/// A validated estimation request
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleQuery {
    make: String,
    model: String,
    year: i32,
    odometer: Option<u32>,
    assumptions: OwnershipAssumptions,
}

impl VehicleQuery {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        odometer: Option<u32>,
        assumptions: OwnershipAssumptions,
    ) -> Result<Self, EstimateError> {
        let make = make.into().trim().to_string();
        let model = model.into().trim().to_string();

        if make.is_empty() {
            return Err(EstimateError::InvalidQuery("make must not be empty".to_string()));
        }
        if model.is_empty() {
            return Err(EstimateError::InvalidQuery("model must not be empty".to_string()));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(EstimateError::InvalidQuery(format!(
                "year must be between {} and {}, got {}",
                MIN_YEAR, MAX_YEAR, year
            )));
        }
        assumptions.validate()?;

        Ok(Self {
            make,
            model,
            year,
            odometer,
            assumptions,
        })
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    /// Manufacturer as the price model was trained on it
    pub fn manufacturer(&self) -> String {
        self.make.to_lowercase()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn odometer(&self) -> Option<u32> {
        self.odometer
    }

    pub fn assumptions(&self) -> &OwnershipAssumptions {
        &self.assumptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EstimateParams {
        EstimateParams {
            make: "Ford".to_string(),
            model: "F150 Pickup 4WD".to_string(),
            year: 2005,
            odometer: Some(99_999),
            miles_per_year: None,
            num_years: None,
            gas_cost: None,
            electrical_cost: None,
            maintenance_cost_per_year: None,
        }
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let defaults = OwnershipAssumptions::default();
        assert_eq!(defaults.miles_per_year, 15_000);
        assert_eq!(defaults.num_years, 5);
        assert_eq!(defaults.gas_cost, 3.0);
        assert_eq!(defaults.electrical_cost, 0.12);
        assert_eq!(defaults.maintenance_cost_per_year, 1000.0);
    }

    #[test]
    fn test_params_fall_back_to_defaults() {
        let query = params().into_query(&OwnershipAssumptions::default()).unwrap();
        assert_eq!(query.make(), "Ford");
        assert_eq!(query.manufacturer(), "ford");
        assert_eq!(query.assumptions(), &OwnershipAssumptions::default());
    }

    #[test]
    fn test_params_override_defaults() {
        let mut p = params();
        p.num_years = Some(10);
        p.gas_cost = Some(4.5);
        let query = p.into_query(&OwnershipAssumptions::default()).unwrap();
        assert_eq!(query.assumptions().num_years, 10);
        assert_eq!(query.assumptions().gas_cost, 4.5);
        assert_eq!(query.assumptions().miles_per_year, 15_000);
    }

    #[test]
    fn test_rejects_zero_years() {
        let mut p = params();
        p.num_years = Some(0);
        let err = p.into_query(&OwnershipAssumptions::default()).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidQuery(_)));
    }

    #[test]
    fn test_rejects_out_of_range_mileage_and_horizon() {
        let mut p = params();
        p.miles_per_year = Some(u32::MAX);
        let err = p.into_query(&OwnershipAssumptions::default()).unwrap_err();
        assert!(err.to_string().contains("miles_per_year"));

        let mut p = params();
        p.miles_per_year = Some(0);
        assert!(p.into_query(&OwnershipAssumptions::default()).is_err());

        let mut p = params();
        p.num_years = Some(51);
        assert!(p.into_query(&OwnershipAssumptions::default()).is_err());

        let mut p = params();
        p.miles_per_year = Some(200_000);
        p.num_years = Some(50);
        assert!(p.into_query(&OwnershipAssumptions::default()).is_ok());
    }

    #[test]
    fn test_rejects_negative_cost() {
        let mut p = params();
        p.maintenance_cost_per_year = Some(-1.0);
        assert!(p.into_query(&OwnershipAssumptions::default()).is_err());
    }

    #[test]
    fn test_rejects_blank_model_and_bad_year() {
        let mut p = params();
        p.model = "   ".to_string();
        assert!(p.into_query(&OwnershipAssumptions::default()).is_err());

        let mut p = params();
        p.year = 1850;
        assert!(p.into_query(&OwnershipAssumptions::default()).is_err());
    }

    #[test]
    fn test_unknown_assumption_field_rejected() {
        let toml = "miles_per_year = 12000\nbogus = 1\n";
        let parsed: Result<OwnershipAssumptions, _> = toml::from_str(toml);
        assert!(parsed.is_err());
    }
}
