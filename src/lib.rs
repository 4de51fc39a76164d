//! Aqar Engine Library
//!
//! Dubai real-estate price prediction engine. Sits between a trained
//! regression model and the client-facing response:
//! - Resolves which input fields apply to a property configuration
//! - Validates inputs against empirically observed ranges (advisory only)
//! - Applies the area pricing-tier multiplier to the base model estimate
//! - Derives price-per-sqm and a confidence level from validation findings

pub mod api;
pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::adjuster::PriceAdjuster;
pub use crate::core::engine::PredictionEngine;
pub use crate::core::form_rules::{FieldPolicy, FormResolver};
pub use crate::core::model::{
    BaselineModel, FeatureEncoder, FeatureVector, LabelEncoder, ModelMetadata, PriceModel,
    TabularEncoder,
};
pub use crate::core::validator::Validator;
pub use crate::models::config::{
    AreaTierEntry, AreaTierTable, FormRule, FormRuleTable, ReferenceTables, ServerConfig,
    SizeRangeEntry, SizeRangeTable, SubtypeProfile, SubtypeProfileTable,
};
pub use crate::models::errors::{EngineError, EngineResult, ErrorCode};
pub use crate::models::types::{
    AreaTier, BatchOutcome, BatchSummary, Bedrooms, ConfidenceLevel, FieldName, FieldRequirement,
    PredictionResult, PredictionState, PropertyRequest, PropertyType, PropertyUsage,
    RegistrationType, Warning, WarningSeverity,
};
pub use crate::utils::telemetry::{TelemetryCollector, TelemetryStats};
