//! HTTP error mapping
//!
//! Every handler error carries an [`ErrorKind`] from the shared taxonomy;
//! the response body exposes it as a machine-readable field next to a
//! human-readable message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use repomind_common::{ErrorClass, ErrorKind};
use serde_json::json;

/// Handler-level error: a kind plus a message
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Wrap any classified crate error
    pub fn from_classified<E: ErrorClass + std::fmt::Display>(error: &E) -> Self {
        Self::new(error.kind(), error.to_string())
    }

    const fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::BadInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::SchemaMismatch => StatusCode::CONFLICT,
            ErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        }));
        (self.status(), body).into_response()
    }
}

impl From<repomind_meta_data::MetaError> for ApiError {
    fn from(e: repomind_meta_data::MetaError) -> Self {
        Self::from_classified(&e)
    }
}

impl From<repomind_rag::RagError> for ApiError {
    fn from(e: repomind_rag::RagError) -> Self {
        Self::from_classified(&e)
    }
}

impl From<repomind_search::SearchError> for ApiError {
    fn from(e: repomind_search::SearchError) -> Self {
        Self::from_classified(&e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_statuses() {
        assert_eq!(ApiError::bad_input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::new(ErrorKind::SchemaMismatch, "x").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::new(ErrorKind::RateLimited, "x").status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
