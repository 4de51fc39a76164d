//! Centralized Error Handling Module
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - REQ_xxx: structural request errors (terminal for that item)
//! - VAL_xxx: computation guards inside the engine
//! - MODEL_xxx: model/encoder boundary errors
//! - CFG_xxx: configuration and reference-table errors
//! - API_xxx: HTTP layer errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct EngineError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Create a new EngineError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create EngineError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Terminal per-item rejection, as opposed to an internal/config fault
    pub fn is_structural(&self) -> bool {
        self.code.is_structural()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Structural Request Errors (1xx)
    // ============================================
    /// area_size is zero, negative or not finite
    ReqNonPositiveArea,
    /// Bedrooms supplied on a property type that cannot have them
    ReqIncompatibleBedrooms,
    /// A mandatory field is absent and has no default
    ReqMissingField,
    /// A field value failed basic parsing/sanity checks
    ReqInvalidValue,

    // ============================================
    // Computation Guards (2xx)
    // ============================================
    /// Derived metric undefined for the given inputs
    ComputationUndefined,

    // ============================================
    // Model Boundary Errors (3xx)
    // ============================================
    /// Feature encoding failed
    ModelEncodingFailed,
    /// Model inference failed (surfaced verbatim, never retried)
    ModelInferenceFailed,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Reference table failed its internal consistency checks
    ConfigInvalidTable,
    /// Area multipliers do not respect tier ordering
    ConfigTierOrdering,
    /// Missing or unreadable table file
    ConfigMissingFile,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // API Errors (5xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Structural request errors
            Self::ReqNonPositiveArea => "REQ_NON_POSITIVE_AREA",
            Self::ReqIncompatibleBedrooms => "REQ_INCOMPATIBLE_BEDROOMS",
            Self::ReqMissingField => "REQ_MISSING_FIELD",
            Self::ReqInvalidValue => "REQ_INVALID_VALUE",

            // Computation guards
            Self::ComputationUndefined => "VAL_COMPUTATION_UNDEFINED",

            // Model boundary
            Self::ModelEncodingFailed => "MODEL_ENCODING_FAILED",
            Self::ModelInferenceFailed => "MODEL_INFERENCE_FAILED",

            // Configuration errors
            Self::ConfigInvalidTable => "CFG_INVALID_TABLE",
            Self::ConfigTierOrdering => "CFG_TIER_ORDERING",
            Self::ConfigMissingFile => "CFG_MISSING_FILE",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // API errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ReqNonPositiveArea
            | Self::ReqIncompatibleBedrooms
            | Self::ReqMissingField
            | Self::ReqInvalidValue
            | Self::ApiBadRequest
            | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::ApiNotFound => 404,
            Self::ApiRateLimited => 429,
            _ => 500,
        }
    }

    /// Whether the code represents a terminal per-item rejection
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ReqNonPositiveArea
                | Self::ReqIncompatibleBedrooms
                | Self::ReqMissingField
                | Self::ReqInvalidValue
                | Self::ComputationUndefined
                | Self::ModelEncodingFailed
                | Self::ModelInferenceFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl EngineError {
    /// Non-positive or non-finite area_size
    pub fn non_positive_area(area_size: f64) -> Self {
        Self::new(
            ErrorCode::ReqNonPositiveArea,
            format!("area_size must be positive (got {})", area_size),
        )
    }

    /// Bedrooms on a property type that cannot have them
    pub fn incompatible_bedrooms(property_type: &str, bedrooms: u8) -> Self {
        Self::new(
            ErrorCode::ReqIncompatibleBedrooms,
            format!("{} cannot have bedrooms (got {})", property_type, bedrooms),
        )
    }

    /// Mandatory field absent with no default
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::ReqMissingField,
            format!("mandatory field {} is missing", field),
        )
    }

    /// Derived metric undefined
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ComputationUndefined, msg)
    }

    /// Feature encoding failed
    pub fn encoding_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModelEncodingFailed, msg)
    }

    /// Model inference failed
    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModelInferenceFailed, msg)
    }

    /// Reference table inconsistency
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidTable, msg)
    }

    /// Tier/multiplier ordering violation
    pub fn tier_ordering(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigTierOrdering, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Engine Result type
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for EngineError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::ConfigMissingFile, "IO error", err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ConfigInvalidTable, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EngineError::non_positive_area(-5.0);
        assert_eq!(err.code, ErrorCode::ReqNonPositiveArea);
        assert_eq!(err.code_str(), "REQ_NON_POSITIVE_AREA");
    }

    #[test]
    fn test_structural() {
        assert!(ErrorCode::ReqNonPositiveArea.is_structural());
        assert!(ErrorCode::ModelInferenceFailed.is_structural());
        assert!(!ErrorCode::ConfigTierOrdering.is_structural());
        assert!(!ErrorCode::ApiRateLimited.is_structural());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ReqIncompatibleBedrooms.http_status(), 400);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::ModelInferenceFailed.http_status(), 500);
    }

    #[test]
    fn test_display_includes_code() {
        let err = EngineError::incompatible_bedrooms("Land", 3);
        let rendered = err.to_string();
        assert!(rendered.contains("REQ_INCOMPATIBLE_BEDROOMS"));
        assert!(rendered.contains("Land cannot have bedrooms"));
    }
}
