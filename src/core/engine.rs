//! Prediction Orchestrator
//!
//! Walks each request through the per-item state machine
//! `Received -> FormResolved -> Validated -> Priced`, short-circuiting to
//! `Rejected` only for hard structural errors. Everything else degrades to
//! warnings and proceeds. The engine is pure and stateless per call: the
//! reference tables are read-only and shared, so instances are cheap to
//! clone and safe to use from any number of tasks.

use std::sync::Arc;
use tracing::debug;

use crate::core::adjuster::PriceAdjuster;
use crate::core::form_rules::{FieldPolicy, FormResolver};
use crate::core::model::{FeatureEncoder, ModelMetadata, PriceModel};
use crate::core::validator::Validator;
use crate::models::config::ReferenceTables;
use crate::models::errors::{EngineError, EngineResult};
use crate::models::types::{
    BatchOutcome, BatchSummary, FieldName, PredictionResult, PredictionState, PropertyRequest,
    PropertyType, PropertyUsage,
};

#[derive(Clone)]
pub struct PredictionEngine {
    tables: Arc<ReferenceTables>,
    encoder: Arc<dyn FeatureEncoder>,
    model: Arc<dyn PriceModel>,
}

impl PredictionEngine {
    pub fn new(
        tables: Arc<ReferenceTables>,
        encoder: Arc<dyn FeatureEncoder>,
        model: Arc<dyn PriceModel>,
    ) -> Self {
        Self {
            tables,
            encoder,
            model,
        }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn model_metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }

    /// Resolve the field policy for a configuration (exposed for the form
    /// endpoint; `predict_one` resolves internally).
    pub fn resolve_policy(
        &self,
        usage: PropertyUsage,
        property_type: PropertyType,
        subtype: Option<&str>,
    ) -> FieldPolicy {
        FormResolver::new(&self.tables.form_rules).resolve(usage, property_type, subtype)
    }

    /// Auto-fill suggestion for the smart form
    pub fn suggest_area_size(&self, bedrooms: u8) -> Option<f64> {
        self.tables.size_ranges.suggest_area_size(bedrooms)
    }

    /// Predict the price of a single property.
    ///
    /// Returns a structural rejection for: non-positive `area_size`, a
    /// bedroom count on Land, a bedroom-requiring configuration without a
    /// bedroom count, or a model/encoder failure. Advisory findings never
    /// reject; they ride along in the result's warnings.
    pub fn predict_one(&self, request: &PropertyRequest) -> EngineResult<PredictionResult> {
        self.run(request).map_err(|err| {
            debug!(
                state = PredictionState::Rejected.as_str(),
                code = err.code_str(),
                "prediction rejected"
            );
            err
        })
    }

    fn run(&self, request: &PropertyRequest) -> EngineResult<PredictionResult> {
        debug!(state = PredictionState::Received.as_str(), area = %request.area_name, "prediction started");
        self.screen(request)?;

        let policy = self.resolve_policy(
            request.usage,
            request.property_type,
            request.subtype.as_deref(),
        );
        // bedrooms is the one mandatory field with no default: the bucket
        // drives both validation and the feature vector
        if policy.is_required(FieldName::Bedrooms) && request.bedrooms.is_none() {
            return Err(EngineError::missing_field(FieldName::Bedrooms.as_str()));
        }
        debug!(state = PredictionState::FormResolved.as_str(), "field policy resolved");

        let warnings = Validator::new(&self.tables).validate(request, &policy);
        debug!(
            state = PredictionState::Validated.as_str(),
            warnings = warnings.len(),
            "validation finished"
        );

        // external boundary: failures are terminal for this item only
        let features = self.encoder.encode(request)?;
        let base_price = self.model.predict(&features)?;

        let result = PriceAdjuster::new(&self.tables.area_tiers).adjust(
            base_price,
            &request.area_name,
            request.area_size,
            warnings,
        )?;
        debug!(
            state = PredictionState::Priced.as_str(),
            confidence = result.confidence.as_str(),
            "prediction priced"
        );
        Ok(result)
    }

    /// Hard structural screen at `Received`; everything that passes here
    /// degrades to warnings downstream.
    fn screen(&self, request: &PropertyRequest) -> EngineResult<()> {
        if !(request.area_size > 0.0) || !request.area_size.is_finite() {
            return Err(EngineError::non_positive_area(request.area_size));
        }
        if request.property_type == PropertyType::Land {
            if let Some(bedrooms) = request.bedrooms {
                if bedrooms.count() > 0 {
                    return Err(EngineError::incompatible_bedrooms(
                        request.property_type.as_str(),
                        bedrooms.count(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Predict a batch. Items are isolated: one rejection never aborts the
    /// siblings, and the summary aggregates successes only.
    pub fn predict_batch(&self, requests: &[PropertyRequest]) -> BatchOutcome {
        let items: Vec<EngineResult<PredictionResult>> =
            requests.iter().map(|req| self.predict_one(req)).collect();
        let summary = BatchSummary::from_results(&items);
        BatchOutcome { items, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{BaselineModel, FeatureVector, TabularEncoder};
    use crate::models::types::{Bedrooms, ConfidenceLevel, RegistrationType};

    /// Model returning a constant price, for exact assertions
    struct FixedModel {
        price: f64,
        metadata: ModelMetadata,
    }

    impl FixedModel {
        fn new(price: f64) -> Self {
            Self {
                price,
                metadata: ModelMetadata {
                    model_type: "Fixed".to_string(),
                    training_samples: 0,
                    r2_score: 1.0,
                    mae: 0.0,
                    price_bounds: (0.0, f64::MAX),
                },
            }
        }
    }

    impl PriceModel for FixedModel {
        fn predict(&self, _features: &FeatureVector) -> EngineResult<f64> {
            Ok(self.price)
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    /// Model that always fails, for boundary-error propagation
    struct BrokenModel {
        metadata: ModelMetadata,
    }

    impl PriceModel for BrokenModel {
        fn predict(&self, _features: &FeatureVector) -> EngineResult<f64> {
            Err(EngineError::inference_failed("estimator artifact corrupt"))
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    fn engine_with_price(price: f64) -> PredictionEngine {
        let tables = Arc::new(ReferenceTables::builtin());
        let encoder = Arc::new(TabularEncoder::from_tables(&tables));
        PredictionEngine::new(tables, encoder, Arc::new(FixedModel::new(price)))
    }

    fn marina_flat() -> PropertyRequest {
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
    fn test_marina_flat_scenario() {
        let engine = engine_with_price(1_745_000.0);
        let result = engine.predict_one(&marina_flat()).unwrap();

        assert!((result.adjusted_price - 2_094_000.0).abs() < 1e-6);
        assert!((result.price_per_sqm - 20_940.0).abs() < 1e-6);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_prediction_is_idempotent() {
        let engine = engine_with_price(1_745_000.0);
        let request = marina_flat();
        let a = engine.predict_one(&request).unwrap();
        let b = engine.predict_one(&request).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_positive_area_rejected() {
        let engine = engine_with_price(1_000_000.0);
        for area_size in [0.0, -3.5] {
            let mut request = marina_flat();
            request.area_size = area_size;
            let err = engine.predict_one(&request).unwrap_err();
            assert_eq!(err.code_str(), "REQ_NON_POSITIVE_AREA");
        }
    }

    #[test]
    fn test_land_with_bedrooms_rejected() {
        let engine = engine_with_price(1_000_000.0);
        let request = PropertyRequest {
            usage: PropertyUsage::Residential,
            property_type: PropertyType::Land,
            subtype: Some("Residential Land".to_string()),
            area_size: 250.0,
            bedrooms: Some(Bedrooms::new(2)),
            has_parking: None,
            has_project: None,
            area_name: "AL BARSHA".to_string(),
            registration_type: None,
        };
        let err = engine.predict_one(&request).unwrap_err();
        assert_eq!(err.code_str(), "REQ_INCOMPATIBLE_BEDROOMS");
        assert!(err.to_string().contains("Land cannot have bedrooms"));
    }

    #[test]
    fn test_studio_on_land_is_not_rejected() {
        let engine = engine_with_price(1_000_000.0);
        let request = PropertyRequest {
            usage: PropertyUsage::Residential,
            property_type: PropertyType::Land,
            subtype: Some("Residential Land".to_string()),
            area_size: 250.0,
            bedrooms: Some(Bedrooms::STUDIO),
            has_parking: None,
            has_project: None,
            area_name: "AL BARSHA".to_string(),
            registration_type: None,
        };
        assert!(engine.predict_one(&request).is_ok());
    }

    #[test]
    fn test_missing_bedrooms_on_unit_rejected() {
        let engine = engine_with_price(1_000_000.0);
        let mut request = marina_flat();
        request.bedrooms = None;
        let err = engine.predict_one(&request).unwrap_err();
        assert_eq!(err.code_str(), "REQ_MISSING_FIELD");
    }

    #[test]
    fn test_model_failure_is_terminal_for_item() {
        let tables = Arc::new(ReferenceTables::builtin());
        let encoder = Arc::new(TabularEncoder::from_tables(&tables));
        let engine = PredictionEngine::new(
            tables,
            encoder,
            Arc::new(BrokenModel {
                metadata: BaselineModel::new().metadata().clone(),
            }),
        );
        let err = engine.predict_one(&marina_flat()).unwrap_err();
        assert_eq!(err.code_str(), "MODEL_INFERENCE_FAILED");
    }

    #[test]
    fn test_advisory_warnings_do_not_reject() {
        let engine = engine_with_price(1_000_000.0);
        let mut request = marina_flat();
        request.area_size = 20.0;
        request.area_name = "BUSINESS BAY".to_string();

        let result = engine.predict_one(&request).unwrap();
        assert_eq!(result.confidence, ConfidenceLevel::Medium);
        assert_eq!(
            result.warnings[0].description(),
            "area_size 20 below typical range [106,143] for 2BR"
        );
    }

    #[test]
    fn test_unknown_area_neutral_and_silent() {
        let engine = engine_with_price(1_234_567.0);
        let mut request = marina_flat();
        request.area_name = "UNKNOWN AREA".to_string();

        let result = engine.predict_one(&request).unwrap();
        assert_eq!(result.adjusted_price, 1_234_567.0);
        assert_eq!(result.multiplier, 1.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_batch_isolation() {
        let engine = engine_with_price(1_000_000.0);
        let land_conflict = PropertyRequest {
            usage: PropertyUsage::Residential,
            property_type: PropertyType::Land,
            subtype: None,
            area_size: 250.0,
            bedrooms: Some(Bedrooms::new(2)),
            has_parking: None,
            has_project: None,
            area_name: "AL BARSHA".to_string(),
            registration_type: None,
        };
        let batch = vec![marina_flat(), land_conflict, marina_flat()];

        let outcome = engine.predict_batch(&batch);
        assert_eq!(outcome.items.len(), 3);
        assert!(outcome.items[0].is_ok());
        assert!(outcome.items[1].is_err());
        assert!(outcome.items[2].is_ok());

        assert_eq!(outcome.summary.total, 3);
        assert_eq!(outcome.summary.succeeded, 2);
        assert_eq!(outcome.summary.rejected, 1);
        assert!((outcome.summary.total_value - 2.0 * 1_200_000.0).abs() < 1e-6);
    }
}
