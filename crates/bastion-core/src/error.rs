//! Error types.

use thiserror::Error;

/// Errors raised while building a gate from configuration.
///
/// These are the only errors a caller ever sees; once a gate exists,
/// every evaluation resolves to a verdict.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set (or is blank).
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },

    /// An endpoint is not a valid URL.
    #[error("invalid endpoint {0}: {1}")]
    InvalidEndpoint(String, String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors from reading a verdict back from its wire shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerdictError {
    /// A `Clean` verdict that is unsafe or degraded.
    #[error("a Clean verdict must be safe and not degraded")]
    InconsistentClean,

    /// The semantic layer never fails closed.
    #[error("an unsafe semantic verdict cannot be degraded")]
    DegradedSemanticBlock,

    /// A statistical verdict with neither a score nor the degraded marker,
    /// or with both.
    #[error("a statistical verdict needs a score or, if unsafe, the degraded marker")]
    MissingScore,

    /// A score outside `[0, 1]`.
    #[error("score out of range: {0}")]
    ScoreOutOfRange(f64),
}

/// Errors from a single upstream classifier call.
///
/// Never returned from [`SafetyLayer::evaluate`](crate::SafetyLayer::evaluate);
/// each adapter maps it to its recovery verdict.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Transport failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Response parsed but lacked a required field.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Longest upstream error body kept in a [`LayerError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 256;

impl LayerError {
    /// Builds a status error, clipping the body for logging.
    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        LayerError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    /// Returns true if the call timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LayerError::Http(e) if e.is_timeout())
    }
}

/// Result type for upstream classifier calls.
pub type Result<T> = std::result::Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_includes_code_and_body() {
        let err = LayerError::Status {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned 503: overloaded");
        assert!(!err.is_timeout());
    }

    #[test]
    fn status_body_is_clipped() {
        let body = "x".repeat(1000);
        let err = LayerError::status(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            LayerError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: LayerError = parse.into();
        assert!(matches!(err, LayerError::Json(_)));
    }

    #[test]
    fn missing_var_names_the_variable() {
        let err = ConfigError::MissingVar("PERSPECTIVE_KEY");
        assert!(err.to_string().contains("PERSPECTIVE_KEY"));
    }
}
