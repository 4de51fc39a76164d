//! Price Adjustment Module
//!
//! Applies the area multiplier to the base model output and derives the
//! per-sqm price and confidence level. No rounding happens here; the
//! presentation layer owns formatting.

use crate::models::config::AreaTierTable;
use crate::models::errors::{EngineError, EngineResult};
use crate::models::types::{AreaTier, ConfidenceLevel, PredictionResult, Warning};

/// Neutral fallback for areas missing from the tier table: no premium or
/// discount is assumed for unknown locations, and the fallback is silent.
pub const FALLBACK_TIER: AreaTier = AreaTier::Average;
pub const FALLBACK_MULTIPLIER: f64 = 1.0;

pub struct PriceAdjuster<'a> {
    tiers: &'a AreaTierTable,
}

impl<'a> PriceAdjuster<'a> {
    pub fn new(tiers: &'a AreaTierTable) -> Self {
        Self { tiers }
    }

    /// Case-insensitive tier lookup with the documented neutral fallback
    pub fn lookup(&self, area_name: &str) -> (AreaTier, f64) {
        match self.tiers.lookup(area_name) {
            Some(entry) => (entry.tier, entry.multiplier),
            None => (FALLBACK_TIER, FALLBACK_MULTIPLIER),
        }
    }

    /// Combine the base price with the area multiplier and the warnings
    /// accumulated so far into the final result.
    ///
    /// Defends against non-positive area_size independently of upstream
    /// screening: price-per-sqm is undefined there and this function may be
    /// called directly.
    pub fn adjust(
        &self,
        base_price: f64,
        area_name: &str,
        area_size: f64,
        warnings: Vec<Warning>,
    ) -> EngineResult<PredictionResult> {
        if !(area_size > 0.0) || !area_size.is_finite() {
            return Err(EngineError::computation(format!(
                "price per sqm undefined for area_size {}",
                area_size
            )));
        }
        if !base_price.is_finite() {
            return Err(EngineError::computation(format!(
                "base price is not finite: {}",
                base_price
            )));
        }

        let (tier, multiplier) = self.lookup(area_name);
        let adjusted_price = base_price * multiplier;
        let price_per_sqm = adjusted_price / area_size;
        let confidence = ConfidenceLevel::from_warnings(&warnings);

        Ok(PredictionResult {
            base_price,
            adjusted_price,
            price_per_sqm,
            multiplier,
            tier,
            confidence,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ReferenceTables;
    use crate::models::types::FieldName;

    #[test]
    fn test_premium_area_adjustment() {
        let tables = ReferenceTables::builtin();
        let adjuster = PriceAdjuster::new(&tables.area_tiers);

        let result = adjuster
            .adjust(1_745_000.0, "DUBAI MARINA", 100.0, vec![])
            .unwrap();

        assert_eq!(result.tier, AreaTier::Premium);
        assert!((result.adjusted_price - 2_094_000.0).abs() < 1e-6);
        assert!((result.price_per_sqm - 20_940.0).abs() < 1e-6);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unknown_area_falls_back_to_neutral() {
        let tables = ReferenceTables::builtin();
        let adjuster = PriceAdjuster::new(&tables.area_tiers);

        let (tier, multiplier) = adjuster.lookup("UNKNOWN AREA");
        assert_eq!(tier, AreaTier::Average);
        assert_eq!(multiplier, 1.0);

        let result = adjuster
            .adjust(1_000_000.0, "UNKNOWN AREA", 80.0, vec![])
            .unwrap();
        assert_eq!(result.adjusted_price, 1_000_000.0);
        // fallback stays silent
        assert!(result.warnings.is_empty());
        assert_eq!(result.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let tables = ReferenceTables::builtin();
        let adjuster = PriceAdjuster::new(&tables.area_tiers);
        assert_eq!(adjuster.lookup("palm jumeirah").0, AreaTier::UltraLuxury);
    }

    #[test]
    fn test_non_positive_area_is_computation_error() {
        let tables = ReferenceTables::builtin();
        let adjuster = PriceAdjuster::new(&tables.area_tiers);

        for area_size in [0.0, -10.0, f64::NAN] {
            let err = adjuster
                .adjust(1_000_000.0, "DUBAI MARINA", area_size, vec![])
                .unwrap_err();
            assert_eq!(err.code_str(), "VAL_COMPUTATION_UNDEFINED");
        }
    }

    #[test]
    fn test_confidence_reflects_warnings() {
        let tables = ReferenceTables::builtin();
        let adjuster = PriceAdjuster::new(&tables.area_tiers);

        let advisory = Warning::SizeBelowTypicalRange {
            area_size: 20.0,
            min_typical: 106.0,
            max_typical: 143.0,
            bucket: "2BR".to_string(),
        };
        let result = adjuster
            .adjust(1_000_000.0, "BUSINESS BAY", 20.0, vec![advisory])
            .unwrap();
        assert_eq!(result.confidence, ConfidenceLevel::Medium);

        let structural = Warning::RequiredFieldMissing {
            field: FieldName::RegistrationType,
        };
        let result = adjuster
            .adjust(1_000_000.0, "BUSINESS BAY", 20.0, vec![structural])
            .unwrap();
        assert_eq!(result.confidence, ConfidenceLevel::Low);
    }
}
