//! Classified errors for LLM API calls.

use std::fmt;

use thiserror::Error;

/// Broad category of an LLM API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// HTTP 429 from the provider.
    RateLimited,
    /// HTTP 5xx from the provider.
    ServerError,
    /// HTTP 4xx other than 429 (bad request, auth, unknown model...).
    ClientError,
    /// Connection refused, DNS failure, timeout.
    Network,
    /// The response body could not be understood.
    Parse,
    /// The provider answered but produced no usable text.
    EmptyResponse,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmErrorKind::RateLimited => "rate_limited",
            LlmErrorKind::ServerError => "server_error",
            LlmErrorKind::ClientError => "client_error",
            LlmErrorKind::Network => "network_error",
            LlmErrorKind::Parse => "parse_error",
            LlmErrorKind::EmptyResponse => "empty_response",
        };
        f.write_str(s)
    }
}

/// Error returned by an [`LlmClient`](super::LlmClient).
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status code, when the failure came from a response.
    pub status: Option<u16>,
}

impl LlmError {
    fn new(kind: LlmErrorKind, message: String, status: Option<u16>) -> Self {
        Self {
            kind,
            message,
            status,
        }
    }

    pub fn rate_limited(message: String) -> Self {
        Self::new(LlmErrorKind::RateLimited, message, Some(429))
    }

    pub fn server_error(status: u16, message: String) -> Self {
        Self::new(LlmErrorKind::ServerError, message, Some(status))
    }

    pub fn client_error(status: u16, message: String) -> Self {
        Self::new(LlmErrorKind::ClientError, message, Some(status))
    }

    pub fn network_error(message: String) -> Self {
        Self::new(LlmErrorKind::Network, message, None)
    }

    pub fn parse_error(message: String) -> Self {
        Self::new(LlmErrorKind::Parse, message, None)
    }

    pub fn empty_response(message: String) -> Self {
        Self::new(LlmErrorKind::EmptyResponse, message, None)
    }
}

/// Map an HTTP status code onto an error category.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        // Anything else that is not a success is unexpected from the provider.
        _ => LlmErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_http_status() {
        assert_eq!(classify_http_status(429), LlmErrorKind::RateLimited);
        assert_eq!(classify_http_status(401), LlmErrorKind::ClientError);
        assert_eq!(classify_http_status(404), LlmErrorKind::ClientError);
        assert_eq!(classify_http_status(500), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(503), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(302), LlmErrorKind::ServerError);
    }

    #[test]
    fn test_error_display_includes_kind_and_message() {
        let err = LlmError::client_error(401, "invalid api key".to_string());
        assert_eq!(err.to_string(), "client_error: invalid api key");
        assert_eq!(err.status, Some(401));
    }
}
