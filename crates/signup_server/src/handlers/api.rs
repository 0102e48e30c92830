//! Signup API, mounted at `/api`.
//!   GET  /health            liveness
//!   GET  /operations        registered operation names
//!   POST /operations/:name  dispatch through the registry

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use signup_core::types::CallContext;

use crate::error::AppError;
use crate::extract::{Caller, Faults};
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_operations(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "operations": state.dispatcher.operations() }))
}

/// An empty body is a `null` input. A `null` result is answered with 204.
pub async fn invoke(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Caller(user): Caller,
    Faults(faults): Faults,
    body: Bytes,
) -> Result<Response, AppError> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    tracing::info!(%operation, %user, "operation invoked");
    let ctx = CallContext::new(user).with_faults(faults);
    let output = state.dispatcher.dispatch(&operation, ctx, input).await?;
    Ok(match output {
        Value::Null => StatusCode::NO_CONTENT.into_response(),
        value => Json(value).into_response(),
    })
}
