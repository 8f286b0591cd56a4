use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Expected JSON, got {content_type}: {body}")]
    UnexpectedContentType { content_type: String, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// How a failed request failed, as far as the session flows care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server could not be reached
    Transport,
    /// The server answered with a non-2xx status
    Auth,
    /// 2xx, but the body was not the expected JSON
    Malformed,
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 100;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        body.chars().take(MAX_ERROR_BODY_LENGTH).collect()
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            code => ApiError::Status {
                status: code,
                body: truncated,
            },
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ApiError::NetworkError(e) if e.is_decode() => FailureKind::Malformed,
            ApiError::NetworkError(_) => FailureKind::Transport,
            ApiError::Unauthorized(_)
            | ApiError::NotFound(_)
            | ApiError::ServerError(_)
            | ApiError::Status { .. } => FailureKind::Auth,
            ApiError::UnexpectedContentType { .. } | ApiError::InvalidResponse(_) => {
                FailureKind::Malformed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "bad token"),
            ApiError::Unauthorized(ref b) if b == "bad token"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::Status { status: 403, .. }
        ));
    }

    #[test]
    fn test_body_is_truncated() {
        let body = "x".repeat(250);
        match ApiError::from_status(StatusCode::UNAUTHORIZED, &body) {
            ApiError::Unauthorized(b) => assert_eq!(b.len(), 100),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "인증".repeat(100);
        assert_eq!(ApiError::truncate_body(&body).chars().count(), 100);
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "").failure_kind(),
            FailureKind::Auth
        );
        assert_eq!(
            ApiError::UnexpectedContentType {
                content_type: "text/html".into(),
                body: String::new()
            }
            .failure_kind(),
            FailureKind::Malformed
        );
        assert_eq!(
            ApiError::InvalidResponse("missing user".into()).failure_kind(),
            FailureKind::Malformed
        );
    }
}
