use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{PricePredictor, VehicleFeatures, FEATURE_COLUMNS};
use crate::error::EstimateError;

/// Mean-of-target encoding for a categorical column
#[derive(Debug, Deserialize)]
struct TargetEncoder {
    categories: HashMap<String, f64>,
    /// Encoding used for categories unseen during training
    default: f64,
}

impl TargetEncoder {
    fn encode(&self, value: &str) -> f64 {
        self.categories.get(value).copied().unwrap_or(self.default)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn evaluate(&self, x: &[f64]) -> Result<f64, EstimateError> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match self.nodes[idx] {
                Node::Leaf { value } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
        Err(EstimateError::Prediction(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }
}

/// Random-forest regressor with target-encoded categorical inputs
///
/// Artifact layout (JSON):
///
/// ```json
/// {
///   "features": ["year", "manufacturer", "model", "odometer"],
///   "encoders": {
///     "manufacturer": { "categories": { "ford": 9100.0 }, "default": 8000.0 },
///     "model": { "categories": { "f-150": 11200.0 }, "default": 8000.0 }
///   },
///   "imputation": { "odometer": 105000.0 },
///   "trees": [ { "nodes": [ { "feature": 0, "threshold": 2004.5, "left": 1, "right": 2 },
///                           { "value": 4200.0 }, { "value": 9800.0 } ] } ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ForestModel {
    features: Vec<String>,
    encoders: HashMap<String, TargetEncoder>,
    #[serde(default)]
    imputation: HashMap<String, f64>,
    trees: Vec<Tree>,
}

impl ForestModel {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, EstimateError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EstimateError::ModelUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let model = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            trees = model.trees.len(),
            "Loaded price model"
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, EstimateError> {
        let model: Self = serde_json::from_str(json).map_err(|e| {
            EstimateError::ModelUnavailable(format!("Failed to parse model artifact: {}", e))
        })?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), EstimateError> {
        let unavailable =
            |msg: String| -> Result<(), EstimateError> { Err(EstimateError::ModelUnavailable(msg)) };

        if self.features != FEATURE_COLUMNS {
            return unavailable(format!(
                "artifact features {:?} do not match expected {:?}",
                self.features, FEATURE_COLUMNS
            ));
        }
        for column in ["manufacturer", "model"] {
            if !self.encoders.contains_key(column) {
                return unavailable(format!("missing encoder for '{}'", column));
            }
        }
        if !self.imputation.contains_key("odometer") {
            return unavailable("missing imputation value for 'odometer'".to_string());
        }
        if self.trees.is_empty() {
            return unavailable("forest has no trees".to_string());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return unavailable(format!("tree {} has no nodes", t));
            }
            for node in &tree.nodes {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= FEATURE_COLUMNS.len() {
                            return unavailable(format!(
                                "tree {} splits on unknown feature {}",
                                t, feature
                            ));
                        }
                        if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            return unavailable(format!("tree {} has a dangling child index", t));
                        }
                        if !threshold.is_finite() {
                            return unavailable(format!("tree {} has a non-finite threshold", t));
                        }
                    }
                    Node::Leaf { value } if !value.is_finite() => {
                        return unavailable(format!("tree {} has a non-finite leaf", t));
                    }
                    Node::Leaf { .. } => {}
                }
            }
        }

        Ok(())
    }

    /// Encode features into the numeric vector the trees consume
    fn encode(&self, features: &VehicleFeatures) -> Vec<f64> {
        let odometer = match features.odometer {
            Some(miles) => miles as f64,
            None => self.imputation["odometer"],
        };

        vec![
            features.year as f64,
            self.encoders["manufacturer"].encode(&features.manufacturer),
            self.encoders["model"].encode(&features.model),
            odometer,
        ]
    }

    /// Predict from an already-encoded feature vector
    pub fn predict_vector(&self, x: &[f64]) -> Result<f64, EstimateError> {
        if x.len() != self.features.len() {
            return Err(EstimateError::Prediction(format!(
                "expected {} features, got {}",
                self.features.len(),
                x.len()
            )));
        }

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(x)?;
        }
        let prediction = total / self.trees.len() as f64;

        if !prediction.is_finite() {
            return Err(EstimateError::Prediction(format!(
                "non-finite prediction {}",
                prediction
            )));
        }
        Ok(prediction)
    }
}

impl PricePredictor for ForestModel {
    fn predict(&self, features: &VehicleFeatures) -> Result<f64, EstimateError> {
        let x = self.encode(features);
        self.predict_vector(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact() -> serde_json::Value {
        json!({
            "features": ["year", "manufacturer", "model", "odometer"],
            "encoders": {
                "manufacturer": { "categories": { "ford": 9000.0, "honda": 11000.0 }, "default": 8000.0 },
                "model": { "categories": { "f-150": 12000.0, "civic": 7000.0 }, "default": 8000.0 }
            },
            "imputation": { "odometer": 100000.0 },
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 2004.5, "left": 1, "right": 2 },
                    { "value": 4000.0 },
                    { "feature": 3, "threshold": 120000.0, "left": 3, "right": 4 },
                    { "value": 10000.0 },
                    { "value": 6000.0 }
                ]},
                { "nodes": [
                    { "feature": 2, "threshold": 10000.0, "left": 1, "right": 2 },
                    { "value": 5000.0 },
                    { "value": 14000.0 }
                ]}
            ]
        })
    }

    fn features(model: &str, odometer: Option<u32>) -> VehicleFeatures {
        VehicleFeatures {
            year: 2005,
            manufacturer: "ford".to_string(),
            model: model.to_string(),
            odometer,
        }
    }

    #[test]
    fn test_predict_is_mean_of_trees() {
        let forest = ForestModel::from_json(&artifact().to_string()).unwrap();

        // tree 1: 2005 > 2004.5, 99999 <= 120000 -> 10000; tree 2: 12000 > 10000 -> 14000
        let price = forest.predict(&features("f-150", Some(99_999))).unwrap();
        assert_eq!(price, 12000.0);

        // unseen model falls back to the default encoding
        let price = forest.predict(&features("model t", Some(150_000))).unwrap();
        assert_eq!(price, 5500.0);
    }

    #[test]
    fn test_missing_odometer_uses_imputation() {
        let forest = ForestModel::from_json(&artifact().to_string()).unwrap();
        let imputed = forest.predict(&features("f-150", None)).unwrap();
        let explicit = forest.predict(&features("f-150", Some(100_000))).unwrap();
        assert_eq!(imputed, explicit);
    }

    #[test]
    fn test_wrong_arity_is_prediction_error() {
        let forest = ForestModel::from_json(&artifact().to_string()).unwrap();
        let err = forest.predict_vector(&[2005.0, 9000.0, 12000.0]).unwrap_err();
        assert!(matches!(err, EstimateError::Prediction(_)));
    }

    #[test]
    fn test_cyclic_tree_is_prediction_error() {
        let mut value = artifact();
        value["trees"] = json!([{ "nodes": [
            { "feature": 0, "threshold": 3000.0, "left": 1, "right": 1 },
            { "feature": 0, "threshold": 3000.0, "left": 0, "right": 0 }
        ]}]);
        let forest = ForestModel::from_json(&value.to_string()).unwrap();
        let err = forest.predict(&features("f-150", None)).unwrap_err();
        assert!(matches!(err, EstimateError::Prediction(_)));
    }

    #[test]
    fn test_invalid_artifacts_are_unavailable() {
        let mut value = artifact();
        value["features"] = json!(["year", "manufacturer", "model"]);
        assert!(matches!(
            ForestModel::from_json(&value.to_string()),
            Err(EstimateError::ModelUnavailable(_))
        ));

        let mut value = artifact();
        value["trees"] = json!([]);
        assert!(ForestModel::from_json(&value.to_string()).is_err());

        let mut value = artifact();
        value["trees"][1]["nodes"][0]["right"] = json!(9);
        assert!(ForestModel::from_json(&value.to_string()).is_err());

        let mut value = artifact();
        value["imputation"] = json!({});
        assert!(ForestModel::from_json(&value.to_string()).is_err());

        assert!(matches!(
            ForestModel::from_json("not json"),
            Err(EstimateError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ForestModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, EstimateError::ModelUnavailable(_)));
    }
}
