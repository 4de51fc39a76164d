//! Aqar Cloud API Server
//!
//! REST API for Dubai real-estate price prediction
//!
//! Usage:
//!   cargo run --bin aqar_api
//!
//! Environment:
//!   AQAR_HOST       - Server host (default: 0.0.0.0)
//!   PORT/AQAR_PORT  - Server port (default: 8080)
//!   AQAR_TABLES_DIR - Directory of JSON reference tables (default: builtin)
//!   RUST_LOG        - Log level (default: info)

use aqar_engine::api::{create_router, handlers::AppState, start_cleanup_task};
use aqar_engine::{
    BaselineModel, PredictionEngine, ReferenceTables, ServerConfig, TabularEncoder,
    TelemetryCollector,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = ServerConfig::default();

    // Reference tables: JSON directory when configured, builtin otherwise
    let tables = match &config.tables_dir {
        Some(dir) => match ReferenceTables::from_json_dir(dir) {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Failed to load tables from {}: {}. Using builtin.", dir.display(), e);
                ReferenceTables::builtin()
            }
        },
        None => ReferenceTables::builtin(),
    };
    let tables = Arc::new(tables);
    info!(
        areas = tables.area_tiers.len(),
        size_buckets = tables.size_ranges.len(),
        "reference tables ready"
    );

    // Engine with the baseline model; deployments swap in the trained artifact
    let encoder = Arc::new(TabularEncoder::from_tables(&tables));
    let model = Arc::new(BaselineModel::new());
    let engine = PredictionEngine::new(tables, encoder, model);

    // Telemetry and app state
    let telemetry = Arc::new(TelemetryCollector::new());
    let telemetry_for_shutdown = telemetry.clone();
    let state = Arc::new(AppState::new(engine, telemetry));

    // Start background cleanup task for rate limiter
    start_cleanup_task();

    // Create router
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Aqar API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/predict          - Predict price for a single property");
    info!("  POST /v1/predict/batch    - Batch prediction (up to 100 properties)");
    info!("  GET  /v1/model/info       - Model information");
    info!("  GET  /v1/areas            - Available areas");
    info!("  GET  /v1/validation/rules - Typical size ranges and subtype profiles");
    info!("  GET  /v1/form/policy      - Dynamic form field policy");
    info!("  GET  /v1/stats            - Service statistics");
    info!("  GET  /v1/health           - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");
    info!("");

    // Start server with graceful shutdown
    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Graceful shutdown sequence
    info!("");
    info!("Shutdown signal received, cleaning up...");

    let stats = telemetry_for_shutdown.stats();
    info!("   Total predictions: {}", stats.total_predictions);
    info!("   Total rejections: {}", stats.total_rejections);
    info!("   Avg latency: {:.2}ms", stats.avg_latency_ms);

    info!("Aqar API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ================================================================
                    A Q A R   C L O U D   A P I   v{}
              Dubai Real-Estate Price Prediction Engine
    ================================================================
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
