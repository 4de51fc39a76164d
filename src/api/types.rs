//! API Request/Response Types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::form_rules::FieldPolicy;
use crate::models::config::{SizeRangeTable, SubtypeProfile};
use crate::models::errors::EngineError;
use crate::models::types::{
    BatchSummary, PredictionResult, PropertyRequest, PropertyType, PropertyUsage,
};
use crate::utils::format::{format_aed, format_price_millions, round2};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "API_INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Engine rejections keep their structural error code on the wire
    pub fn from_engine(err: &EngineError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Prediction
// ============================================

/// Estimated price range around the adjusted mid-point (±10%)
#[derive(Debug, Clone, Serialize)]
pub struct PriceRange {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionData {
    /// Adjusted mid-point price in AED
    pub predicted_price: f64,
    pub predicted_price_formatted: String,
    /// Raw model output before the location multiplier
    pub base_price: f64,
    pub multiplier: f64,
    pub tier: String,
    pub price_range: PriceRange,
    pub price_range_formatted: String,
    pub price_per_sqm: f64,
    pub confidence_level: String,
    pub warnings: Vec<String>,
    /// Input echoed back for traceability
    pub input: PropertyRequest,
}

impl PredictionData {
    pub fn from_result(result: &PredictionResult, input: &PropertyRequest) -> Self {
        let lower_bound = result.adjusted_price * 0.90;
        let upper_bound = result.adjusted_price * 1.10;

        Self {
            predicted_price: round2(result.adjusted_price),
            predicted_price_formatted: format_aed(result.adjusted_price),
            base_price: round2(result.base_price),
            multiplier: result.multiplier,
            tier: result.tier.as_str().to_string(),
            price_range: PriceRange {
                lower_bound: round2(lower_bound),
                upper_bound: round2(upper_bound),
            },
            price_range_formatted: format!(
                "{} - {} AED",
                format_price_millions(lower_bound),
                format_price_millions(upper_bound)
            ),
            price_per_sqm: round2(result.price_per_sqm),
            confidence_level: result.confidence.as_str().to_string(),
            warnings: result.warnings.iter().map(|w| w.description()).collect(),
            input: input.clone(),
        }
    }
}

// ============================================
// Batch Prediction
// ============================================

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub properties: Vec<PropertyRequest>,
    /// Max concurrent predictions (default: 10, max: 50)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct BatchItemData {
    pub index: usize,
    pub status: String, // "success" | "rejected"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictData {
    pub summary: BatchSummary,
    pub results: Vec<BatchItemData>,
    pub processing_time_ms: f64,
}

// ============================================
// Model Info
// ============================================

#[derive(Debug, Serialize)]
pub struct ModelInfoData {
    pub model_type: String,
    pub training_samples: u64,
    pub r2_score: f64,
    pub mae: f64,
    pub available_areas: Vec<String>,
    pub available_property_subtypes: Vec<String>,
    pub available_registration_types: Vec<String>,
    pub price_range: PriceRange,
}

// ============================================
// Reference data endpoints
// ============================================

#[derive(Debug, Serialize)]
pub struct AreasData {
    pub total_areas: usize,
    pub areas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationRulesData {
    pub size_ranges: SizeRangeTable,
    pub subtype_profiles: HashMap<String, SubtypeProfile>,
    pub description: String,
}

/// Query for resolving a field policy ("smart form" support)
#[derive(Debug, Deserialize)]
pub struct FormPolicyQuery {
    pub usage: PropertyUsage,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    pub subtype: Option<String>,
    /// When set, a suggested area_size for the bucket is included
    #[serde(default)]
    pub bedrooms: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct FormPolicyData {
    pub usage: PropertyUsage,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub policy: FieldPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_area_size: Option<f64>,
}

// ============================================
// Stats / Health
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub total_predictions: u64,
    pub total_rejections: u64,
    pub total_warnings: u64,
    pub avg_latency_ms: f64,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub areas_loaded: usize,
    pub size_buckets_loaded: usize,
}
