//! API Request Handlers

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::types::*;
use crate::core::engine::PredictionEngine;
use crate::models::errors::EngineError;
use crate::models::types::{BatchSummary, PredictionResult, PropertyRequest, RegistrationType};
use crate::utils::format::round2;
use crate::utils::telemetry::TelemetryCollector;

/// Shared application state
pub struct AppState {
    pub engine: PredictionEngine,
    pub telemetry: Arc<TelemetryCollector>,
    pub start_time: Instant,
    pub batch_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(engine: PredictionEngine, telemetry: Arc<TelemetryCollector>) -> Self {
        Self {
            engine,
            telemetry,
            start_time: Instant::now(),
            batch_semaphore: Arc::new(Semaphore::new(100)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type ApiErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn reject(err: &EngineError, start: Instant) -> ApiErrorReply {
    (
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ApiResponse::error(
            ApiError::from_engine(err),
            start.elapsed().as_secs_f64() * 1000.0,
        )),
    )
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        areas_loaded: state.engine.tables().area_tiers.len(),
        size_buckets_loaded: state.engine.tables().size_ranges.len(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Single Prediction
// ============================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PropertyRequest>,
) -> Result<Json<ApiResponse<PredictionData>>, ApiErrorReply> {
    let start = Instant::now();

    match state.engine.predict_one(&request) {
        Ok(result) => {
            state.telemetry.record_prediction(
                result.warnings.len(),
                start.elapsed().as_micros() as u64,
            );
            let data = PredictionData::from_result(&result, &request);
            Ok(Json(ApiResponse::success(
                data,
                start.elapsed().as_secs_f64() * 1000.0,
            )))
        }
        Err(err) => {
            state
                .telemetry
                .record_rejection(start.elapsed().as_micros() as u64);
            warn!(code = err.code_str(), area = %request.area_name, "prediction rejected");
            Err(reject(&err, start))
        }
    }
}

// ============================================
// Batch Prediction
// ============================================

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<ApiResponse<BatchPredictData>>, ApiErrorReply> {
    let start = Instant::now();

    if request.properties.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("properties array cannot be empty"),
                start.elapsed().as_secs_f64() * 1000.0,
            )),
        ));
    }
    if request.properties.len() > 100 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("Maximum 100 properties per batch request"),
                start.elapsed().as_secs_f64() * 1000.0,
            )),
        ));
    }

    let concurrency = request.concurrency.clamp(1, 50);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(request.properties.len());

    // each item runs its own state machine; a rejection never aborts siblings
    for (index, property) in request.properties.into_iter().enumerate() {
        let sem = semaphore.clone();
        let engine = state.engine.clone();

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore never closed");
            let item_start = Instant::now();
            let outcome = engine.predict_one(&property);
            let latency_ms = item_start.elapsed().as_secs_f64() * 1000.0;
            (index, property, outcome, latency_ms)
        }));
    }

    let mut items: Vec<Result<PredictionResult, EngineError>> = Vec::new();
    let mut results: Vec<BatchItemData> = Vec::new();
    for handle in handles {
        let (index, property, outcome, latency_ms) = handle
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        ApiError::internal(format!("batch task failed: {}", e)),
                        start.elapsed().as_secs_f64() * 1000.0,
                    )),
                )
            })?;

        let item = match &outcome {
            Ok(result) => {
                state
                    .telemetry
                    .record_prediction(result.warnings.len(), (latency_ms * 1000.0) as u64);
                BatchItemData {
                    index,
                    status: "success".to_string(),
                    prediction: Some(PredictionData::from_result(result, &property)),
                    error: None,
                    latency_ms,
                }
            }
            Err(err) => {
                state
                    .telemetry
                    .record_rejection((latency_ms * 1000.0) as u64);
                BatchItemData {
                    index,
                    status: "rejected".to_string(),
                    prediction: None,
                    error: Some(ApiError::from_engine(err)),
                    latency_ms,
                }
            }
        };
        results.push(item);
        items.push(outcome);
    }

    let summary = BatchSummary::from_results(&items);
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        rejected = summary.rejected,
        total_value = round2(summary.total_value),
        "batch prediction finished"
    );

    let data = BatchPredictData {
        summary,
        results,
        processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    Ok(Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}

// ============================================
// Model Info
// ============================================

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ModelInfoData>> {
    let start = Instant::now();
    let metadata = state.engine.model_metadata();
    let tables = state.engine.tables();

    let data = ModelInfoData {
        model_type: metadata.model_type.clone(),
        training_samples: metadata.training_samples,
        r2_score: (metadata.r2_score * 10_000.0).round() / 10_000.0,
        mae: round2(metadata.mae),
        available_areas: tables.area_tiers.area_names(),
        available_property_subtypes: tables.form_rules.all_subtypes(),
        available_registration_types: RegistrationType::ALL
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
        price_range: PriceRange {
            lower_bound: metadata.price_bounds.0,
            upper_bound: metadata.price_bounds.1,
        },
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Reference data
// ============================================

pub async fn areas(State(state): State<Arc<AppState>>) -> Json<ApiResponse<AreasData>> {
    let start = Instant::now();
    let names = state.engine.tables().area_tiers.area_names();

    let data = AreasData {
        total_areas: names.len(),
        areas: names,
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

pub async fn validation_rules(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ValidationRulesData>> {
    let start = Instant::now();
    let tables = state.engine.tables();

    let data = ValidationRulesData {
        size_ranges: tables.size_ranges.clone(),
        subtype_profiles: tables.subtype_profiles.profiles().clone(),
        description: "Validation rules based on analysis of 1.5M Dubai property transactions (2000-2025)"
            .to_string(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

/// Resolve the dynamic form policy for a property configuration
pub async fn form_policy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormPolicyQuery>,
) -> Json<ApiResponse<FormPolicyData>> {
    let start = Instant::now();

    let policy = state.engine.resolve_policy(
        query.usage,
        query.property_type,
        query.subtype.as_deref(),
    );
    let suggested_area_size = query
        .bedrooms
        .and_then(|b| state.engine.suggest_area_size(b));

    let data = FormPolicyData {
        usage: query.usage,
        property_type: query.property_type,
        subtype: query.subtype,
        policy,
        suggested_area_size,
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let stats = state.telemetry.stats();

    let data = StatsData {
        total_predictions: stats.total_predictions,
        total_rejections: stats.total_rejections,
        total_warnings: stats.total_warnings,
        avg_latency_ms: stats.avg_latency_ms,
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}
