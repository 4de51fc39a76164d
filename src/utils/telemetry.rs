//! Telemetry Module
//!
//! Anonymous aggregate counters for monitoring the prediction service.
//! No request payloads are stored, only counts and latency.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated statistics snapshot for the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryStats {
    /// Predictions that reached the Priced state
    pub total_predictions: u64,
    /// Items rejected with a structural error
    pub total_rejections: u64,
    /// Warnings attached across all successful predictions
    pub total_warnings: u64,
    /// Average engine latency in milliseconds
    pub avg_latency_ms: f64,
}

/// Lock-free telemetry collector shared across request handlers
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    predictions: AtomicU64,
    rejections: AtomicU64,
    warnings: AtomicU64,
    latency_total_us: AtomicU64,
    latency_samples: AtomicU64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_prediction(&self, warnings: usize, latency_us: u64) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.warnings.fetch_add(warnings as u64, Ordering::Relaxed);
        self.record_latency(latency_us);
    }

    pub fn record_rejection(&self, latency_us: u64) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_us);
    }

    fn record_latency(&self, latency_us: u64) {
        self.latency_total_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TelemetryStats {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let avg_latency_ms = if samples == 0 {
            0.0
        } else {
            self.latency_total_us.load(Ordering::Relaxed) as f64 / samples as f64 / 1000.0
        };

        TelemetryStats {
            total_predictions: self.predictions.load(Ordering::Relaxed),
            total_rejections: self.rejections.load(Ordering::Relaxed),
            total_warnings: self.warnings.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let telemetry = TelemetryCollector::new();
        telemetry.record_prediction(2, 1_000);
        telemetry.record_prediction(0, 3_000);
        telemetry.record_rejection(2_000);

        let stats = telemetry.stats();
        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.total_rejections, 1);
        assert_eq!(stats.total_warnings, 2);
        assert!((stats.avg_latency_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats() {
        let stats = TelemetryCollector::new().stats();
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.avg_latency_ms, 0.0);
    }
}
