//! Type definitions for the Aqar prediction engine
//! All core data structures for property requests, warnings and results

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::errors::EngineError;

/// Property usage category (top level of the DLD hierarchy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyUsage {
    Residential,
    Commercial,
    Industrial,
}

impl PropertyUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyUsage::Residential => "Residential",
            PropertyUsage::Commercial => "Commercial",
            PropertyUsage::Industrial => "Industrial",
        }
    }
}

/// Property type within a usage category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    Unit,
    Villa,
    Land,
    Building,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Unit => "Unit",
            PropertyType::Villa => "Villa",
            PropertyType::Land => "Land",
            PropertyType::Building => "Building",
        }
    }
}

/// Registration type of the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationType {
    #[serde(alias = "Off-Plan Properties", alias = "Off-Plan")]
    OffPlan,
    Ready,
    #[serde(alias = "Existing Properties")]
    Existing,
}

impl RegistrationType {
    pub const ALL: [RegistrationType; 3] = [
        RegistrationType::OffPlan,
        RegistrationType::Ready,
        RegistrationType::Existing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationType::OffPlan => "Off-Plan",
            RegistrationType::Ready => "Ready",
            RegistrationType::Existing => "Existing",
        }
    }
}

/// Bedroom count with a Studio sentinel (Studio == 0)
///
/// Accepts either an integer or the string "Studio" on deserialization,
/// matching the transaction data convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Bedrooms(u8);

impl Bedrooms {
    pub const STUDIO: Bedrooms = Bedrooms(0);

    pub fn new(count: u8) -> Self {
        Bedrooms(count)
    }

    pub fn count(&self) -> u8 {
        self.0
    }

    pub fn is_studio(&self) -> bool {
        self.0 == 0
    }

    /// Bucket label used in size-range lookups and warnings ("Studio", "2BR")
    pub fn bucket_label(&self) -> String {
        if self.0 == 0 {
            "Studio".to_string()
        } else {
            format!("{}BR", self.0)
        }
    }
}

impl fmt::Display for Bedrooms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bucket_label())
    }
}

impl<'de> Deserialize<'de> for Bedrooms {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u8),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(Bedrooms(n)),
            Raw::Label(s) if s.eq_ignore_ascii_case("studio") => Ok(Bedrooms(0)),
            Raw::Label(s) => Err(serde::de::Error::custom(format!(
                "invalid bedrooms value: {:?}",
                s
            ))),
        }
    }
}

/// Pricing tier assigned to an area
///
/// Discriminants encode the ordering so multipliers can be checked
/// against tier rank at table load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaTier {
    Budget = 0,
    Average = 1,
    Premium = 2,
    Luxury = 3,
    UltraLuxury = 4,
}

impl AreaTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaTier::Budget => "Budget",
            AreaTier::Average => "Average",
            AreaTier::Premium => "Premium",
            AreaTier::Luxury => "Luxury",
            AreaTier::UltraLuxury => "Ultra Luxury",
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// Fields of a property request, in deterministic policy order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Usage,
    #[serde(rename = "type")]
    PropertyType,
    Subtype,
    AreaSize,
    Bedrooms,
    HasParking,
    HasProject,
    AreaName,
    RegistrationType,
}

impl FieldName {
    pub const ALL: [FieldName; 9] = [
        FieldName::Usage,
        FieldName::PropertyType,
        FieldName::Subtype,
        FieldName::AreaSize,
        FieldName::Bedrooms,
        FieldName::HasParking,
        FieldName::HasProject,
        FieldName::AreaName,
        FieldName::RegistrationType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Usage => "usage",
            FieldName::PropertyType => "type",
            FieldName::Subtype => "subtype",
            FieldName::AreaSize => "area_size",
            FieldName::Bedrooms => "bedrooms",
            FieldName::HasParking => "has_parking",
            FieldName::HasProject => "has_project",
            FieldName::AreaName => "area_name",
            FieldName::RegistrationType => "registration_type",
        }
    }
}

/// What the form expects of a single field for a given property configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    Required,
    Optional,
    Hidden,
    /// Visible, prefilled from reference data (e.g. area_size from the
    /// bedroom bucket average); a supplied value always wins
    AutoFilled,
}

/// A property prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRequest {
    pub usage: PropertyUsage,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Property size in square meters, must be positive
    pub area_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<Bedrooms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_parking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_project: Option<bool>,
    pub area_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_type: Option<RegistrationType>,
}

impl PropertyRequest {
    /// Whether the request carries any value for the field (Studio counts)
    pub fn is_provided(&self, field: FieldName) -> bool {
        match field {
            FieldName::Usage | FieldName::PropertyType | FieldName::AreaSize => true,
            FieldName::AreaName => !self.area_name.trim().is_empty(),
            FieldName::Subtype => self.subtype.is_some(),
            FieldName::Bedrooms => self.bedrooms.is_some(),
            FieldName::HasParking => self.has_parking.is_some(),
            FieldName::HasProject => self.has_project.is_some(),
            FieldName::RegistrationType => self.registration_type.is_some(),
        }
    }

    /// Whether the field carries a value that conflicts with a Hidden policy.
    /// Zero bedrooms is tolerated on bedroom-less property types.
    pub fn conflicts_when_hidden(&self, field: FieldName) -> bool {
        match field {
            FieldName::Bedrooms => self.bedrooms.map(|b| b.count() > 0).unwrap_or(false),
            _ => self.is_provided(field),
        }
    }
}

/// Severity of a validation warning, used to derive the confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    /// Range advisories: cap confidence at Medium
    Advisory,
    /// Policy violations and mismatches: cap confidence at Low
    Structural,
}

/// Validation findings attached to a prediction, never blocking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A value was supplied for a field the form hides for this configuration
    HiddenFieldSupplied { field: FieldName },
    /// A required field is absent; prediction proceeds with the default class
    RequiredFieldMissing { field: FieldName },
    /// area_size below the typical range for the bedroom bucket
    SizeBelowTypicalRange {
        area_size: f64,
        min_typical: f64,
        max_typical: f64,
        bucket: String,
    },
    /// area_size above the typical range for the bedroom bucket
    SizeAboveTypicalRange {
        area_size: f64,
        min_typical: f64,
        max_typical: f64,
        bucket: String,
    },
    /// Land carrying a nonzero bedroom count
    LandWithBedrooms { bedrooms: u8 },
    /// Subtype not in the known set for the property type
    UnknownSubtype {
        subtype: String,
        property_type: PropertyType,
    },
    /// Bedroom count outside the typical span for the subtype
    AtypicalBedrooms {
        subtype: String,
        bedrooms: u8,
        typical_min: u8,
        typical_max: u8,
    },
    /// area_size outside the typical span for the subtype
    SubtypeSizeMismatch {
        subtype: String,
        area_size: f64,
        min_typical: f64,
        max_typical: f64,
    },
}

impl Warning {
    pub fn severity(&self) -> WarningSeverity {
        match self {
            Warning::SizeBelowTypicalRange { .. }
            | Warning::SizeAboveTypicalRange { .. }
            | Warning::AtypicalBedrooms { .. }
            | Warning::SubtypeSizeMismatch { .. } => WarningSeverity::Advisory,
            Warning::HiddenFieldSupplied { .. }
            | Warning::RequiredFieldMissing { .. }
            | Warning::LandWithBedrooms { .. }
            | Warning::UnknownSubtype { .. } => WarningSeverity::Structural,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Warning::HiddenFieldSupplied { field } => {
                format!(
                    "{} is not applicable for this property configuration",
                    field.as_str()
                )
            }
            Warning::RequiredFieldMissing { field } => {
                format!("required field {} is missing", field.as_str())
            }
            Warning::SizeBelowTypicalRange {
                area_size,
                min_typical,
                max_typical,
                bucket,
            } => {
                format!(
                    "area_size {} below typical range [{},{}] for {}",
                    area_size, min_typical, max_typical, bucket
                )
            }
            Warning::SizeAboveTypicalRange {
                area_size,
                min_typical,
                max_typical,
                bucket,
            } => {
                format!(
                    "area_size {} above typical range [{},{}] for {}",
                    area_size, min_typical, max_typical, bucket
                )
            }
            Warning::LandWithBedrooms { bedrooms } => {
                format!("Land cannot have bedrooms (got {})", bedrooms)
            }
            Warning::UnknownSubtype {
                subtype,
                property_type,
            } => {
                format!(
                    "subtype {:?} is not known for type {}",
                    subtype,
                    property_type.as_str()
                )
            }
            Warning::AtypicalBedrooms {
                subtype,
                bedrooms,
                typical_min,
                typical_max,
            } => {
                format!(
                    "{} typically has {}-{} bedrooms (got {})",
                    subtype, typical_min, typical_max, bedrooms
                )
            }
            Warning::SubtypeSizeMismatch {
                subtype,
                area_size,
                min_typical,
                max_typical,
            } => {
                format!(
                    "{} typically ranges {}-{} sqm (got {})",
                    subtype, min_typical, max_typical, area_size
                )
            }
        }
    }
}

/// Confidence in a prediction, derived from accumulated warnings only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }

    /// No warnings => High, only advisory => Medium, anything else => Low
    pub fn from_warnings(warnings: &[Warning]) -> Self {
        if warnings.is_empty() {
            ConfidenceLevel::High
        } else if warnings
            .iter()
            .all(|w| w.severity() == WarningSeverity::Advisory)
        {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Per-item state machine for a prediction, forward transitions only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionState {
    Received = 0,
    FormResolved = 1,
    Validated = 2,
    Priced = 3,
    Rejected = 4,
}

impl PredictionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionState::Received => "received",
            PredictionState::FormResolved => "form_resolved",
            PredictionState::Validated => "validated",
            PredictionState::Priced => "priced",
            PredictionState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PredictionState::Priced | PredictionState::Rejected)
    }
}

/// Final prediction for a single property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Raw model output before the location multiplier
    pub base_price: f64,
    /// base_price * area multiplier, unrounded
    pub adjusted_price: f64,
    /// adjusted_price / area_size, unrounded
    pub price_per_sqm: f64,
    /// Multiplier that was applied (1.0 for unknown areas)
    pub multiplier: f64,
    pub tier: AreaTier,
    pub confidence: ConfidenceLevel,
    pub warnings: Vec<Warning>,
}

/// Aggregate summary over the successful items of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub rejected: usize,
    pub average_adjusted_price: f64,
    pub total_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_adjusted_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_adjusted_price: Option<f64>,
}

impl BatchSummary {
    /// Aggregates successes only; rejected items never contribute
    pub fn from_results(items: &[Result<PredictionResult, EngineError>]) -> Self {
        let succeeded: Vec<&PredictionResult> =
            items.iter().filter_map(|r| r.as_ref().ok()).collect();
        let total_value: f64 = succeeded.iter().map(|p| p.adjusted_price).sum();
        let average = if succeeded.is_empty() {
            0.0
        } else {
            total_value / succeeded.len() as f64
        };

        Self {
            total: items.len(),
            succeeded: succeeded.len(),
            rejected: items.len() - succeeded.len(),
            average_adjusted_price: average,
            total_value,
            min_adjusted_price: succeeded
                .iter()
                .map(|p| p.adjusted_price)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v)))),
            max_adjusted_price: succeeded
                .iter()
                .map(|p| p.adjusted_price)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v)))),
        }
    }
}

/// Result of a batch run: per-item outcomes plus the aggregate summary
#[derive(Debug)]
pub struct BatchOutcome {
    pub items: Vec<Result<PredictionResult, EngineError>>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bedrooms_deserialize_studio() {
        let b: Bedrooms = serde_json::from_str("\"Studio\"").unwrap();
        assert!(b.is_studio());
        let b: Bedrooms = serde_json::from_str("3").unwrap();
        assert_eq!(b.count(), 3);
        assert_eq!(b.bucket_label(), "3BR");
    }

    #[test]
    fn test_tier_rank_ordering() {
        assert!(AreaTier::UltraLuxury.rank() > AreaTier::Luxury.rank());
        assert!(AreaTier::Luxury.rank() > AreaTier::Premium.rank());
        assert!(AreaTier::Premium.rank() > AreaTier::Average.rank());
        assert!(AreaTier::Average.rank() > AreaTier::Budget.rank());
    }

    #[test]
    fn test_confidence_from_warnings() {
        assert_eq!(ConfidenceLevel::from_warnings(&[]), ConfidenceLevel::High);

        let advisory = Warning::SizeBelowTypicalRange {
            area_size: 20.0,
            min_typical: 106.0,
            max_typical: 143.0,
            bucket: "2BR".to_string(),
        };
        assert_eq!(
            ConfidenceLevel::from_warnings(&[advisory.clone()]),
            ConfidenceLevel::Medium
        );

        let structural = Warning::RequiredFieldMissing {
            field: FieldName::Bedrooms,
        };
        assert_eq!(
            ConfidenceLevel::from_warnings(&[advisory, structural]),
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn test_size_warning_description_format() {
        let w = Warning::SizeBelowTypicalRange {
            area_size: 20.0,
            min_typical: 106.0,
            max_typical: 143.0,
            bucket: "2BR".to_string(),
        };
        assert_eq!(
            w.description(),
            "area_size 20 below typical range [106,143] for 2BR"
        );
    }

    #[test]
    fn test_state_machine_ordering() {
        assert!((PredictionState::Received as u8) < (PredictionState::FormResolved as u8));
        assert!((PredictionState::FormResolved as u8) < (PredictionState::Validated as u8));
        assert!((PredictionState::Validated as u8) < (PredictionState::Priced as u8));
        assert!(PredictionState::Priced.is_terminal());
        assert!(PredictionState::Rejected.is_terminal());
        assert!(!PredictionState::Validated.is_terminal());
    }

    #[test]
    fn test_request_field_presence() {
        let req = PropertyRequest {
            usage: PropertyUsage::Residential,
            property_type: PropertyType::Land,
            subtype: None,
            area_size: 250.0,
            bedrooms: Some(Bedrooms::STUDIO),
            has_parking: None,
            has_project: None,
            area_name: "DUBAI MARINA".to_string(),
            registration_type: None,
        };

        assert!(req.is_provided(FieldName::Bedrooms));
        // Studio on Land does not conflict with a Hidden bedrooms policy
        assert!(!req.conflicts_when_hidden(FieldName::Bedrooms));
        assert!(!req.is_provided(FieldName::Subtype));
    }

    #[test]
    fn test_batch_summary_ignores_rejections() {
        let ok = PredictionResult {
            base_price: 1_000_000.0,
            adjusted_price: 1_200_000.0,
            price_per_sqm: 12_000.0,
            multiplier: 1.2,
            tier: AreaTier::Premium,
            confidence: ConfidenceLevel::High,
            warnings: vec![],
        };
        let items = vec![
            Ok(ok.clone()),
            Err(EngineError::non_positive_area(-1.0)),
            Ok(PredictionResult {
                adjusted_price: 1_800_000.0,
                ..ok
            }),
        ];
        let summary = BatchSummary::from_results(&items);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.rejected, 1);
        assert!((summary.total_value - 3_000_000.0).abs() < 1e-6);
        assert!((summary.average_adjusted_price - 1_500_000.0).abs() < 1e-6);
        assert_eq!(summary.min_adjusted_price, Some(1_200_000.0));
        assert_eq!(summary.max_adjusted_price, Some(1_800_000.0));
    }
}
