//! Gateway error types and rejection bodies

use config::ConfigError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::admission::Admission;

/// Failures that stop the process. Admission outcomes are never errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body sent with every rejection
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Body for a rejected admission
    pub fn for_admission(outcome: Admission, header_name: &str) -> Self {
        let message = match outcome {
            Admission::Allowed => "Request admitted".to_string(),
            Admission::Unauthenticated => "Gateway has no API keys configured".to_string(),
            Admission::Forbidden => format!("Missing or invalid API key. Provide it via the {} header", header_name),
            Admission::RateLimited => "Rate limit exceeded".to_string(),
        };
        Self::new(outcome.error_code(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_message_names_header() {
        let body = ErrorResponse::for_admission(Admission::Forbidden, "X-Custom-Key");
        assert_eq!(body.error, "forbidden");
        assert!(body.message.contains("X-Custom-Key"));
    }

    #[test]
    fn test_serializes_error_and_message() {
        let body = ErrorResponse::for_admission(Admission::RateLimited, "X-API-Key");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "rate_limit_exceeded");
        assert_eq!(json["message"], "Rate limit exceeded");
    }
}
