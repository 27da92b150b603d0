//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`bf_core::Error`]
//! converts with `?` and renders as `{error, code, retryable}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: bf_core::Error,
}

impl AppError {
    pub fn new(inner: bf_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &bf_core::Error {
        &self.inner
    }
}

impl From<bf_core::Error> for AppError {
    fn from(e: bf_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "retryable": self.inner.is_retryable(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(bf_core::Error::not_found("event", "abc"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nothing_to_export_has_distinct_code() {
        let response =
            AppError::new(bf_core::Error::NothingToExport("e1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "nothing_to_export");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn unavailable_is_retryable_503() {
        let response =
            AppError::new(bf_core::Error::UpstreamUnavailable("loading".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "upstream_unavailable");
        assert_eq!(body["retryable"], true);
    }
}
