//! Registration mock endpoints, mounted at `/registration`.
//!
//!   GET  /events                                   all events
//!   GET  /events/:id                               one event
//!   GET  /sessions?eventId=                        sessions of an event
//!   GET  /events/:id/sessions                      same, path form
//!   POST /register                                 {eventId, participant}
//!   POST /events/:id/register                      [{participant}]
//!   POST /registerSession                          {eventId, sessionId, participant}
//!   POST /events/:id/sessions/:session_id/register [{participant}]
//!   GET  /registrations?eventId=                   recorded registrations
//!
//! The path forms take an optional body. Without a participant they register
//! the caller.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use signup_core::types::{Event, RegisterRequest, RegisterSessionRequest, Registration, Session};
use signup_core::SignupError;

use crate::error::AppError;
use crate::extract::Caller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParam {
    pub event_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParticipantBody {
    pub participant: Option<String>,
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, AppError> {
    value.ok_or_else(|| SignupError::InvalidInput(format!("{name} is required")).into())
}

/// Participant named in an optional path-form body, else the caller.
fn participant_or_caller(body: &[u8], caller: String) -> Result<String, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(caller);
    }
    let body: ParticipantBody = serde_json::from_slice(body)?;
    Ok(body
        .participant
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(caller))
}

fn signed_up() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Sign up successful" })),
    )
}

fn signed_up_for_session() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Signed up for the session successfully" })),
    )
}

pub async fn list_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.registrations.list_events())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(state.registrations.get_event(event_id)?))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    params: Result<Query<EventParam>, QueryRejection>,
) -> Result<Json<Vec<Session>>, AppError> {
    let Query(params) = params?;
    let event_id = required(params.event_id, "eventId")?;
    Ok(Json(state.registrations.list_sessions(event_id)?))
}

pub async fn event_sessions(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<Json<Vec<Session>>, AppError> {
    Ok(Json(state.registrations.list_sessions(event_id)?))
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = body?;
    let event_id = required(req.event_id, "eventId")?;
    let participant = req.participant.unwrap_or_default();
    let registration = state.registrations.register(event_id, &participant)?;
    tracing::info!(event_id, participant = %registration.participant, "registered for event");
    Ok(signed_up())
}

pub async fn register_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
    Caller(user): Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let participant = participant_or_caller(&body, user)?;
    state.registrations.register(event_id, &participant)?;
    tracing::info!(event_id, %participant, "registered for event");
    Ok(signed_up())
}

pub async fn register_session(
    State(state): State<AppState>,
    body: Result<Json<RegisterSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = body?;
    let event_id = required(req.event_id, "eventId")?;
    let session_id = required(req.session_id, "sessionId")?;
    let participant = req.participant.unwrap_or_default();
    state
        .registrations
        .register_session(event_id, session_id, &participant)?;
    tracing::info!(event_id, session_id, %participant, "registered for session");
    Ok(signed_up_for_session())
}

pub async fn register_for_session(
    State(state): State<AppState>,
    Path((event_id, session_id)): Path<(u64, u64)>,
    Caller(user): Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let participant = participant_or_caller(&body, user)?;
    state
        .registrations
        .register_session(event_id, session_id, &participant)?;
    tracing::info!(event_id, session_id, %participant, "registered for session");
    Ok(signed_up_for_session())
}

pub async fn list_registrations(
    State(state): State<AppState>,
    params: Result<Query<EventParam>, QueryRejection>,
) -> Result<Json<Vec<Registration>>, AppError> {
    let Query(params) = params?;
    let event_id = required(params.event_id, "eventId")?;
    Ok(Json(state.registrations.registrations(event_id)?))
}
