//! Maps `SignupError` onto HTTP responses with a JSON error body.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use signup_core::types::ErrorBody;
use signup_core::SignupError;

#[derive(Debug)]
pub struct AppError(pub SignupError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        let body = ErrorBody::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<SignupError> for AppError {
    fn from(err: SignupError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SignupError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(SignupError::InvalidInput(rejection.body_text()))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self(SignupError::InvalidInput(format!("invalid JSON body: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_kind() {
        let cases = [
            (SignupError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (SignupError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SignupError::Transient("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (SignupError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                SignupError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError(err).into_response().status(), expected);
        }
    }
}
