use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - invalid credentials")]
    Unauthorized,

    #[error("Access denied - token may be expired")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // The cut point must land on a char boundary or the slice panics.
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            )
        }
    }

    /// Pull the `{"error": "..."}` message the backend sends with 4xx
    /// responses, falling back to the raw body.
    fn backend_message(body: &str) -> String {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            error: String,
        }
        serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| Self::truncate_body(body))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 => ApiError::Validation(Self::backend_message(body)),
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(Self::truncate_body(body)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(body))),
        }
    }

    /// True for the single failure class the client recovers from via a
    /// token refresh.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "token expired"),
            ApiError::Forbidden
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "gone"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ApiError::ServerError(_)
        ));
    }

    #[test]
    fn test_validation_extracts_backend_error_field() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Email already registered"}"#,
        );
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Email already registered"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_only_forbidden_is_auth_failure() {
        assert!(ApiError::Forbidden.is_auth_failure());
        assert!(!ApiError::Unauthorized.is_auth_failure());
        assert!(!ApiError::RateLimited.is_auth_failure());
    }

    #[test]
    fn test_body_truncation() {
        let long_body = "x".repeat(2000);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &long_body);
        let msg = err.to_string();
        assert!(msg.contains("truncated"));
        assert!(msg.len() < 700);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 499 ASCII bytes followed by a 3-byte char straddling the cut point
        let mut body = "x".repeat(499);
        body.push('€');
        body.push_str(&"y".repeat(100));
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let msg = err.to_string();
        assert!(msg.contains("truncated"));
        assert!(!msg.contains('€'));
        assert!(msg.contains(&"x".repeat(499)));
    }
}
