//! Structured errors for tool consumers
//!
//! Library code returns typed errors; this is the flattened form they take
//! when they cross the protocol boundary.

use crate::ScalarError;
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const OVERFLOW: &str = "OVERFLOW";
    pub const DIMENSION_MISMATCH: &str = "DIMENSION_MISMATCH";
    pub const MISSING_NORMAL_UNIT: &str = "MISSING_NORMAL_UNIT";
    pub const MISSING_DEFINITION: &str = "MISSING_DEFINITION";
    pub const CYCLIC_DEFINITION: &str = "CYCLIC_DEFINITION";
    pub const INVALID_NORMAL_UNIT: &str = "INVALID_NORMAL_UNIT";
    pub const UNKNOWN_UNIT: &str = "UNKNOWN_UNIT";
    pub const UNKNOWN_DIMENSION: &str = "UNKNOWN_DIMENSION";
    pub const UNKNOWN_SYSTEM: &str = "UNKNOWN_SYSTEM";
    pub const DUPLICATE: &str = "DUPLICATE";
    pub const IN_USE: &str = "IN_USE";
    pub const STORAGE: &str = "STORAGE";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Structured error for protocol consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MensuraError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl MensuraError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// JSON form used in tool results
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "code": self.code, "message": self.message })
        })
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Use a plain decimal such as \"2.54\"")
    }

    pub fn div_zero() -> Self {
        Self::new(codes::DIV_ZERO, "Division by zero")
            .with_suggestion("A unit normalized to zero cannot be a conversion target")
    }

    pub fn overflow() -> Self {
        Self::new(codes::OVERFLOW, "Numeric overflow")
            .with_suggestion("Scalars hold at most 18 digits, 9 of them fractional")
    }

    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_ARGUMENT, details.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
    }
}

impl std::fmt::Display for MensuraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for MensuraError {}

impl From<ScalarError> for MensuraError {
    fn from(err: ScalarError) -> Self {
        match err {
            ScalarError::ParseError(s) => Self::parse_error(s),
            ScalarError::DivisionByZero => Self::div_zero(),
            ScalarError::Overflow => Self::overflow(),
        }
    }
}
