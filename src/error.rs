// ⚠️ Error taxonomy shared by the library
// Validation errors reach the caller; provider errors are recovered internally

use thiserror::Error;

// ============================================================================
// VALIDATION
// ============================================================================

/// Which side of the date range failed to validate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn name(&self) -> &'static str {
        match self {
            DateField::Start => "start_date",
            DateField::End => "end_date",
        }
    }
}

/// Malformed date input. The message is surfaced to HTTP clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} must be a string of the format 'YYYY-MM-DD'", .field.name())]
pub struct ValidationError {
    pub field: DateField,
}

impl ValidationError {
    pub fn new(field: DateField) -> Self {
        ValidationError { field }
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Failure to complete a call to the transaction aggregator at all.
///
/// A structured error *response* from the aggregator is not a `ProviderError`;
/// see [`crate::aggregator::ProviderResponse::Failure`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

// ============================================================================
// LLM PROVIDER
// ============================================================================

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::new(DateField::Start).to_string(),
            "start_date must be a string of the format 'YYYY-MM-DD'"
        );
        assert_eq!(
            ValidationError::new(DateField::End).to_string(),
            "end_date must be a string of the format 'YYYY-MM-DD'"
        );
    }

    #[test]
    fn test_config_error_names_variable() {
        let err = ConfigError::Invalid {
            key: "PLAID_MAX_ATTEMPTS",
            value: "many".to_string(),
            expected: "a positive integer",
        };
        assert!(err.to_string().contains("PLAID_MAX_ATTEMPTS"));
        assert!(err.to_string().contains("many"));
    }
}
