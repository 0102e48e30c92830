//! Request extractors shared by the handlers.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use signup_core::fault::FaultDirective;

use crate::error::AppError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The `delay` / `fault` directive of a request. Headers win over query
/// parameters of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults(pub FaultDirective);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Faults {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let pick = |name: &str| {
            header(&parts.headers, name).or_else(|| query.get(name).map(String::as_str))
        };
        let directive = FaultDirective::parse(pick("delay"), pick("fault"))?;
        if !directive.is_empty() {
            tracing::debug!(?directive, path = %parts.uri.path(), "fault directive on request");
        }
        Ok(Self(directive))
    }
}

/// The calling user: the local part of `x-user-id` (an email or a bare id),
/// or the configured default user.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = header(&parts.headers, USER_HEADER)
            .map(user_id_of)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| state.default_user.to_string());
        Ok(Self(user))
    }
}

fn user_id_of(raw: &str) -> String {
    raw.trim()
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string()
}
