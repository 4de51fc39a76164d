//! Core Module - Prediction Business Logic
//!
//! Form-dependency resolution, advisory validation, price adjustment and
//! the orchestrating engine, plus the model/encoder boundary traits.

pub mod adjuster;
pub mod engine;
pub mod form_rules;
pub mod model;
pub mod validator;

pub use adjuster::*;
pub use engine::*;
pub use form_rules::*;
pub use model::*;
pub use validator::*;
