//! Error handling for the Tollgate Server API
//!
//! This module contains standardized error handling for the API.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use tollgate_core::CoreError;

/// API Error type for returning standard error responses
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),
    /// Unauthorized (401)
    Unauthorized(String),
    /// Not found (404)
    NotFound(String),
    /// Wrapped engine error
    CoreError(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::CoreError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::CoreError(err) => write!(f, "{}", err),
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "BadRequest({})", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized({})", msg),
            ApiError::NotFound(msg) => write!(f, "NotFound({})", msg),
            ApiError::CoreError(err) => write!(f, "CoreError({:?})", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code, message) = match &self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST".to_string(), msg.clone())
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "ERR_UNAUTHORIZED".to_string(), msg.clone())
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "ERR_NOT_FOUND".to_string(), format!("{} not found", msg))
            }
            ApiError::CoreError(err) => return core_error_response(err),
        };

        error_body(status, &error_code, &message)
    }
}

/// Map an engine error onto the API's status codes and error body
pub fn core_error_response(err: &CoreError) -> axum::response::Response {
    let (status, error_code, message) = match err {
        CoreError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            "ERR_NOT_FOUND".to_string(),
            err.to_string(),
        ),
        CoreError::ValidationError(msg) => (
            StatusCode::BAD_REQUEST,
            "ERR_VALIDATION_ERROR".to_string(),
            msg.clone(),
        ),
        CoreError::AuthorizationError(msg) => (
            StatusCode::FORBIDDEN,
            "ERR_FORBIDDEN".to_string(),
            msg.clone(),
        ),
        CoreError::InvalidState { .. } => (
            StatusCode::CONFLICT,
            "ERR_INVALID_STATE".to_string(),
            err.to_string(),
        ),
        CoreError::Conflict(msg) => (
            StatusCode::CONFLICT,
            "ERR_CONFLICT".to_string(),
            msg.clone(),
        ),
        CoreError::ProvisioningFailure(msg) => (
            StatusCode::BAD_GATEWAY,
            "ERR_PROVISIONING_FAILURE".to_string(),
            msg.clone(),
        ),
        CoreError::StateStoreError(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_STATE_STORE_ERROR".to_string(),
            msg.clone(),
        ),
        CoreError::SerializationError(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_SERIALIZATION_ERROR".to_string(),
            msg.clone(),
        ),
        CoreError::Other(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_INTERNAL_SERVER_ERROR".to_string(),
            msg.clone(),
        ),
    };

    error_body(status, &error_code, &message)
}

fn error_body(status: StatusCode, error_code: &str, message: &str) -> axum::response::Response {
    let body = Json(json!({
        "error": message,
        "errorDetails": {
            "errorCode": error_code,
            "errorMessage": message,
        }
    }));
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (
                CoreError::ValidationError("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::AuthorizationError("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                CoreError::NotFound("Application x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::invalid_state("DRAFT", "SUBMITTED"),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::Conflict("stale".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::ProvisioningFailure("down".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CoreError::StateStoreError("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = core_error_response(&err);
            assert_eq!(response.status(), expected, "{:?}", err);
        }
    }
}
