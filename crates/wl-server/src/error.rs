//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`wl_core::Error`]
//! converts into [`AppError`] with `?`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: wl_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: wl_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<wl_core::Error> for AppError {
    fn from(e: wl_core::Error) -> Self {
        Self::new(e)
    }
}

/// Malformed or mistyped JSON bodies are client errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(wl_core::Error::Validation(rejection.body_text()))
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
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(wl_core::Error::not_found("movie", "tt1"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_produces_409() {
        let err = AppError::new(wl_core::Error::Conflict("busy".into()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn metadata_failure_produces_502() {
        let err = AppError::new(wl_core::Error::metadata("tt1", "HTTP 500"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn with_request_id() {
        let err = AppError::new(wl_core::Error::Internal("oops".into()))
            .with_request_id("req-123".into());
        assert_eq!(err.request_id.as_deref(), Some("req-123"));
    }
}
