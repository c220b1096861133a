//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, ApiError>`; any [`fairway_common::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fairway_common::Error;
use serde_json::json;

/// Wrapper so `IntoResponse` can be implemented for the shared error type.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller. User-facing variants carry it verbatim.
    fn message(&self) -> String {
        match &self.0 {
            Error::Forbidden(msg) | Error::InvalidInput(msg) | Error::PayloadTooLarge(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::not_found("hole"), StatusCode::NOT_FOUND),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::forbidden("no"), StatusCode::FORBIDDEN),
            (Error::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (Error::payload_too_large("big"), StatusCode::PAYLOAD_TOO_LARGE),
            (Error::database("db"), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_user_facing_message_is_verbatim() {
        let err = ApiError(Error::forbidden("You can only delete your own uploads."));
        assert_eq!(err.message(), "You can only delete your own uploads.");

        let err = ApiError(Error::not_found("hole 3"));
        assert_eq!(err.message(), "Not found: hole 3");
    }
}
