//! Router construction for the signup server.

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, goals, registration};
use crate::state::AppState;

/// Build the full axum router: both mocks plus the operation API.
pub fn build_router(state: AppState) -> Router {
    let registration = Router::new()
        .route("/events", get(registration::list_events))
        .route("/events/:event_id", get(registration::get_event))
        .route("/events/:event_id/sessions", get(registration::event_sessions))
        .route("/events/:event_id/register", post(registration::register_for_event))
        .route(
            "/events/:event_id/sessions/:session_id/register",
            post(registration::register_for_session),
        )
        .route("/sessions", get(registration::list_sessions))
        .route("/register", post(registration::register))
        .route("/registerSession", post(registration::register_session))
        .route("/registrations", get(registration::list_registrations));

    let odata = Router::new().route(
        "/:resource",
        get(goals::read).post(goals::create).delete(goals::remove),
    );

    let api = Router::new()
        .route("/health", get(api::health))
        .route("/operations", get(api::list_operations))
        .route("/operations/:operation", post(api::invoke));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/registration", registration)
        .nest("/odata/v2", odata)
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
