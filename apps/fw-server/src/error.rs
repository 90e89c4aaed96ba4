// Maps each crate's typed error enum onto the query surface's structured
// `{error, status_code, path}` payload (§7). No handler matches on string
// messages — every mapping below switches on the error's variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    path: String,
    status: StatusCode,
    error: String,
}

impl ApiError {
    pub fn new(path: impl Into<String>, status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            error: error.into(),
        }
    }

    pub fn not_found(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(path, StatusCode::NOT_FOUND, error)
    }

    pub fn bad_request(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(path, StatusCode::BAD_REQUEST, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "status_code": self.status.as_u16(),
            "path": self.path,
        }));
        (self.status, body).into_response()
    }
}

pub fn from_store(path: &str, err: fw_store::StoreError) -> ApiError {
    use fw_store::StoreError::*;
    let status = match &err {
        SchemaInvalid | PrivacyViolation(_) | MissingFailure | InvalidReasonCode { .. }
        | InvalidSignalCode { .. } => StatusCode::BAD_REQUEST,
        IntegrityConflict(_) => StatusCode::CONFLICT,
        RunNotFound(_) => StatusCode::NOT_FOUND,
        Unavailable(_) | Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::new(path, status, err.to_string())
}
