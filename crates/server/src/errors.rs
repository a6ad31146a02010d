use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use service::errors::TaxonomyError;

/// JSON error body: `{"error": <title>, "detail": <message>, "code": <numeric>}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: &'static str,
    pub detail: Option<String>,
    pub code: u16,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    code: u16,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &'static str, detail: Option<String>) -> Self {
        Self { status, title, detail, code: status.as_u16() }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        let e = TaxonomyError::Unauthorized;
        Self { status: StatusCode::UNAUTHORIZED, title: "Unauthorized", detail: Some(detail.into()), code: e.code() }
    }
}

impl From<TaxonomyError> for JsonApiError {
    fn from(e: TaxonomyError) -> Self {
        let (status, title) = match &e {
            TaxonomyError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            TaxonomyError::ScopeMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Scope Mismatch"),
            TaxonomyError::OrderConflict(_) => (StatusCode::CONFLICT, "Order Conflict"),
            TaxonomyError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            TaxonomyError::MissingTranslation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Missing Translation"),
            TaxonomyError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            TaxonomyError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Store Error"),
        };
        if status.is_server_error() {
            error!(err = %e, code = e.code(), "taxonomy request failed");
        } else if status == StatusCode::CONFLICT {
            warn!(err = %e, "taxonomy order conflict");
        }
        Self { status, title, detail: Some(e.to_string()), code: e.code() }
    }
}

/// Malformed or incomplete bodies are validation failures.
impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "request body rejected");
        let code = TaxonomyError::Validation(String::new()).code();
        Self { status: StatusCode::BAD_REQUEST, title: "Validation Error", detail: Some(rejection.body_text()), code }
    }
}

/// `Json` extractor whose rejections use the JSON error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(JsonApiError))]
pub struct ApiJson<T>(pub T);

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.title, detail: self.detail.as_deref(), code: self.code };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
