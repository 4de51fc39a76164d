//! Utils Module - Helper Functions & Shared Utilities

pub mod format;
pub mod telemetry;

pub use format::*;
pub use telemetry::*;
