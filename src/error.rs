//! Error taxonomy for the HTTP boundary.
//!
//! Background work (polling, persistence) contains its own failures and only
//! logs them. Errors defined here are the ones a synchronous caller sees.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Client-caused problems with a payload or query parameter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("timestamp could not be parsed: {0}")]
    InvalidTimestamp(String),

    #[error("sensor id could not be determined")]
    MissingSensorId,

    #[error("values object is malformed: {0}")]
    InvalidValues(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("invalid query parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

/// Error returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        let message = match &self {
            ApiError::Validation(e) => {
                tracing::debug!("Rejected request: {}", e);
                e.to_string()
            }
            ApiError::Unavailable(msg) => msg.clone(),
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        // ---
        let err = ApiError::from(ValidationError::MissingSensorId);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "sensor id could not be determined");
    }

    #[test]
    fn test_internal_maps_to_server_error() {
        // ---
        let err = ApiError::from(anyhow::anyhow!("csv exploded"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_param_message_names_the_parameter() {
        // ---
        let err = ValidationError::InvalidParam {
            name: "month",
            reason: "must be between 1 and 12".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid query parameter 'month': must be between 1 and 12"
        );
    }
}
