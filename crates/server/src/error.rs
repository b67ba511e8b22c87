//! Request-level errors and their JSON envelopes.
//!
//! Every error leaving the front end becomes a tagged JSON body:
//! `missing_url` (400), `fetch_failed` (upstream status, with the
//! upstream body and code attached), or `storage_failure` (500).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by the context-fetch route.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The required `url` query parameter was missing or empty.
    #[error("missing 'url' query parameter")]
    MissingUrl,

    /// The live fetch came back non-2xx (or a cacheable transport fault
    /// stood in for one); the upstream status and body ride along.
    #[error("failed to fetch resource at {url}")]
    FetchFailed { url: String, code: u16, body: String },

    /// The response store failed during the operation; everything was
    /// rolled back.
    #[error("storage failure: {0}")]
    Storage(kontext_core::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "missing_url",
                    "message": "Missing 'url' query parameter",
                })),
            )
                .into_response(),
            ApiError::FetchFailed { url, code, body } => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                Json(json!({
                    "error": "fetch_failed",
                    "message": format!("Failed to fetch resource at {url}"),
                    "response": body,
                    "code": code,
                })),
            )
                .into_response(),
            ApiError::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "storage_failure",
                    "message": e.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_url_envelope() {
        let response = ApiError::MissingUrl.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "missing_url");
        assert_eq!(body["message"], "Missing 'url' query parameter");
    }

    #[tokio::test]
    async fn test_fetch_failed_carries_upstream_status() {
        let err = ApiError::FetchFailed { url: "https://example.com/x".into(), code: 503, body: "down".into() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["error"], "fetch_failed");
        assert_eq!(body["code"], 503);
        assert_eq!(body["response"], "down");
        assert_eq!(body["message"], "Failed to fetch resource at https://example.com/x");
    }

    #[tokio::test]
    async fn test_fetch_failed_with_invalid_status_falls_back() {
        let err = ApiError::FetchFailed { url: "https://example.com/x".into(), code: 99, body: String::new() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let err = ApiError::Storage(kontext_core::Error::InvalidInput("bad".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "storage_failure");
    }
}
