/*
[INPUT]:  Error sources (HTTP transport, API status, serialization, URL building)
[OUTPUT]: Structured error types with context for callers
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Main error type for the imgpress adapter
#[derive(Error, Debug)]
pub enum ImgpressError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-2xx response
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// The service accepted the job but reported that it failed
    #[error("Processing failed: {message}")]
    Processing { message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body shapes the service is known to send
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ImgpressError {
    /// Check if the service itself reported the job as failed
    pub fn is_processing_failure(&self) -> bool {
        matches!(self, ImgpressError::Processing { .. })
    }

    /// Check if the request timed out at the transport level
    pub fn is_timeout(&self) -> bool {
        matches!(self, ImgpressError::Http(err) if err.is_timeout())
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        ImgpressError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Build an API error from a non-2xx response body.
    ///
    /// Prefers the body's `message` or `error` field, then the raw body,
    /// then the canonical reason phrase.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .filter(|message| !message.trim().is_empty());

        let message = match parsed {
            Some(message) => message,
            None if !body.trim().is_empty() => body.trim().to_string(),
            None => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Self::api_error(status, message)
    }
}

/// Result type alias for imgpress operations
pub type Result<T> = std::result::Result<T, ImgpressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let err = ImgpressError::api_error(StatusCode::BAD_REQUEST, "Invalid quality");
        match err {
            ImgpressError::Api { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "Invalid quality");
            }
            _ => panic!("Expected Api error variant"),
        }
    }

    #[test]
    fn test_from_response_prefers_message_field() {
        let err = ImgpressError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"file too large: maximum size is 10MB"}"#,
        );
        assert_eq!(
            err.to_string(),
            "API error (code 400): file too large: maximum size is 10MB"
        );
    }

    #[test]
    fn test_from_response_falls_back_to_error_field_and_raw_body() {
        let err = ImgpressError::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"storage unavailable"}"#,
        );
        assert!(matches!(err, ImgpressError::Api { code: 500, ref message } if message == "storage unavailable"));

        let err = ImgpressError::from_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert!(matches!(err, ImgpressError::Api { code: 502, ref message } if message == "upstream down"));
    }

    #[test]
    fn test_from_response_empty_body_uses_reason() {
        let err = ImgpressError::from_response(StatusCode::NOT_FOUND, "");
        assert!(matches!(err, ImgpressError::Api { code: 404, ref message } if message == "Not Found"));
    }

    #[test]
    fn test_processing_failure_flag() {
        let err = ImgpressError::Processing {
            message: "decode error".to_string(),
        };
        assert!(err.is_processing_failure());
        assert!(!err.is_timeout());
        assert!(!ImgpressError::Config("bad".into()).is_processing_failure());
    }
}
