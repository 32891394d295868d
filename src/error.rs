// Error taxonomy for remote operations.
//
// Every failure that can come back from the facility website is one of these
// variants. The executor in `session` consults `is_retryable` to decide
// whether a forced re-login and a single re-execution is worth attempting.

use thiserror::Error;

/// HTTP statuses that indicate a stale session or a transient server fault.
pub const RETRYABLE_STATUSES: [u16; 5] = [401, 403, 500, 502, 503];

#[derive(Error, Debug)]
pub enum ApiError {
    /// No active session token is available.
    #[error("[NO_SESSION] {0}")]
    NoSession(String),

    /// Credentials rejected, or the authenticated-content anchor was missing
    /// from a page that requires login.
    #[error("[AUTH_ERROR] {0}")]
    Auth(String),

    /// Non-2xx response from the facility.
    #[error("[HTTP_ERROR] HTTP {status}")]
    Http {
        status: u16,
        details: Option<String>,
    },

    /// Transport-level failure: connection refused, timeout, TLS.
    #[error("[REQUEST_FAILED] {0}")]
    RequestFailed(String),

    /// Markup or payload shape unrecognized. Retrying never helps here: a
    /// structural contract was violated upstream.
    #[error("[PARSE_ERROR] {0}")]
    Parse(String),

    /// Catch-all for anything not pre-classified.
    #[error("[UNEXPECTED_ERROR] {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn parse(message: impl Into<String>) -> Self {
        ApiError::Parse(message.into())
    }

    /// The stable error code carried to callers.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoSession(_) => "NO_SESSION",
            ApiError::Auth(_) => "AUTH_ERROR",
            ApiError::Http { .. } => "HTTP_ERROR",
            ApiError::RequestFailed(_) => "REQUEST_FAILED",
            ApiError::Parse(_) => "PARSE_ERROR",
            ApiError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Whether a session refresh plus one re-execution may fix this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NoSession(_) | ApiError::Auth(_) | ApiError::RequestFailed(_) => true,
            ApiError::Http { status, .. } => RETRYABLE_STATUSES.contains(status),
            ApiError::Parse(_) | ApiError::Unexpected(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(401, true; "unauthorized")]
    #[test_case(403, true; "forbidden")]
    #[test_case(500, true; "server error")]
    #[test_case(502, true; "bad gateway")]
    #[test_case(503, true; "unavailable")]
    #[test_case(404, false; "not found")]
    #[test_case(400, false; "bad request")]
    #[test_case(418, false; "teapot")]
    fn http_retryability(status: u16, expected: bool) {
        let err = ApiError::Http {
            status,
            details: None,
        };
        assert_eq!(err.is_retryable(), expected);
    }

    #[test]
    fn classification() {
        assert!(ApiError::NoSession("no token".into()).is_retryable());
        assert!(ApiError::Auth("rejected".into()).is_retryable());
        assert!(ApiError::RequestFailed("timeout".into()).is_retryable());
        assert!(!ApiError::Parse("bad markup".into()).is_retryable());
        assert!(!ApiError::Unexpected("boom".into()).is_retryable());
    }

    #[test]
    fn codes_and_display() {
        let err = ApiError::Http {
            status: 503,
            details: Some("maintenance".into()),
        };
        assert_eq!(err.code(), "HTTP_ERROR");
        assert_eq!(err.to_string(), "[HTTP_ERROR] HTTP 503");

        let err = ApiError::Parse("schedule block missing".into());
        assert_eq!(err.code(), "PARSE_ERROR");
        assert!(err.to_string().starts_with("[PARSE_ERROR]"));
    }
}
