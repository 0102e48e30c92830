//! HTTP contract of the router: mock endpoints, error mapping, fault
//! directives and the operation API. Requests go through
//! `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use signup_core::config::SignupConfig;
use signup_core::fault::FaultInjector;
use signup_core::store::{MockGoalStore, MockRegistrationStore};
use signup_server::{build_router, AppState};
use tower::ServiceExt;

fn app() -> (Router, AppState) {
    let state = AppState::with_stores(
        &SignupConfig::default(),
        Arc::new(MockRegistrationStore::seeded()),
        Arc::new(MockGoalStore::with_injector(FaultInjector::seeded(3))),
    )
    .unwrap();
    (build_router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

// ── Registration mock ──────────────────────────────────────────

#[tokio::test]
async fn events_are_plain_json() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/registration/events")).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["name"], "TechEd 2023");
    assert_eq!(events[0]["sessionIDs"], json!([101, 102, 103, 104]));
}

#[tokio::test]
async fn sessions_by_query_and_by_path_agree() {
    let (app, _) = app();
    let (status, by_query) = send(&app, get("/registration/sessions?eventId=1")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, by_path) = send(&app, get("/registration/events/1/sessions")).await;
    assert_eq!(by_query, by_path);
    assert_eq!(by_query.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn missing_or_unknown_event_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/registration/sessions")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = send(&app, get("/registration/events/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn registrations_are_recorded() {
    let (app, state) = app();
    let (status, body) = send(
        &app,
        post(
            "/registration/register",
            json!({ "eventId": 1, "participant": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Sign up successful");

    let (status, body) = send(
        &app,
        post(
            "/registration/registerSession",
            json!({ "eventId": 1, "sessionId": 101, "participant": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Signed up for the session successfully");

    let (_, body) = send(&app, get("/registration/registrations?eventId=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(state.registrations.registrations(1).unwrap().len(), 2);
}

#[tokio::test]
async fn session_of_another_event_is_not_found() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        post(
            "/registration/events/1/sessions/201/register",
            json!({ "participant": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn path_form_without_body_registers_the_caller() {
    let (app, state) = app();
    let request = Request::post("/registration/events/1/register")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Sign up successful");

    let request = Request::post("/registration/events/1/sessions/101/register")
        .header("x-user-id", "carol@example.com")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Signed up for the session successfully");

    let participants: Vec<String> = state
        .registrations
        .registrations(1)
        .unwrap()
        .into_iter()
        .map(|r| r.participant)
        .collect();
    assert_eq!(participants, ["demo", "carol"]);
}

#[tokio::test]
async fn path_form_body_names_the_participant() {
    let (app, state) = app();
    let (status, _) = send(
        &app,
        post("/registration/events/1/register", json!({ "participant": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        post("/registration/events/1/register", json!({ "participant": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let registrations = state.registrations.registrations(1).unwrap();
    assert_eq!(registrations[0].participant, "alice");
    assert_eq!(registrations[1].participant, "demo");

    let request = Request::post("/registration/events/1/register")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (app, _) = app();
    let request = Request::post("/registration/register")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

// ── Goal mock ──────────────────────────────────────────────────

#[tokio::test]
async fn goal_lifecycle_through_odata() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        post(
            "/odata/v2/Goal_101",
            json!({
                "userId": "alice",
                "name": "ID00 Learn something at TechEd 2023",
                "category": "Learning and Growth",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let goal_id = body["d"]["id"].as_u64().unwrap();
    assert_eq!(body["d"]["state"], "On Track");

    let (status, body) = send(
        &app,
        post(
            "/odata/v2/GoalTask_101",
            json!({ "objId": goal_id, "description": "Opening Keynote", "done": 10.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["d"]["objId"], goal_id);

    let (status, body) = send(
        &app,
        get("/odata/v2/Goal_101?$top=5&$filter=userId%20eq%20'alice'"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["d"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["tasks"]["results"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get(&format!("/odata/v2/Goal_101({goal_id})"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["d"]["userId"], "alice");

    let (status, _) = send(&app, delete(&format!("/odata/v2/Goal_101({goal_id})"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, get(&format!("/odata/v2/Goal_101({goal_id})"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn goal_without_user_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(&app, post("/odata/v2/Goal_101", json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn deleting_unknown_goal_is_a_no_op() {
    let (app, _) = app();
    let (status, _) = send(&app, delete("/odata/v2/Goal_101(9999)")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_entity_set_is_not_found() {
    let (app, _) = app();
    let (status, _) = send(&app, get("/odata/v2/Goal_999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fault_header_fails_the_list() {
    let (app, _) = app();
    let request = Request::get("/odata/v2/Goal_101")
        .header("fault", "100")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "transient");
}

#[tokio::test]
async fn fault_query_parameter_is_honoured() {
    let (app, _) = app();
    let (status, _) = send(&app, get("/odata/v2/Goal_101?fault=100")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn invalid_fault_percentage_is_a_bad_request() {
    let (app, _) = app();
    let request = Request::get("/odata/v2/Goal_101")
        .header("fault", "150")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn delay_header_holds_the_response() {
    let (app, _) = app();
    let request = Request::get("/odata/v2/Goal_101")
        .header("delay", "1500")
        .body(Body::empty())
        .unwrap();
    let start = tokio::time::Instant::now();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(start.elapsed() >= std::time::Duration::from_millis(1500));
}

// ── Operation API ──────────────────────────────────────────────

#[tokio::test]
async fn health_and_operation_listing() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, body) = send(&app, get("/api/operations")).await;
    assert_eq!(
        body["operations"],
        json!(["createGoal", "deleteGoal", "getLearningGoals", "signUp"])
    );
}

#[tokio::test]
async fn sign_up_uses_the_caller_from_the_header() {
    let (app, state) = app();
    let request = Request::post("/api/operations/signUp")
        .header("x-user-id", "alice@example.com")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["session"], "Opening Keynote");
    assert_eq!(body["goalCreated"], true);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Opening Keynote"));

    let goal = state.goals.get_goal(body["goalId"].as_u64().unwrap()).unwrap();
    assert_eq!(goal.user_id, "alice");
    assert_eq!(state.registrations.registrations(1).unwrap().len(), 2);
}

#[tokio::test]
async fn caller_defaults_to_configured_user() {
    let (app, _) = app();
    let (status, _) = send(&app, post("/api/operations/createGoal", json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, post("/api/operations/getLearningGoals", Value::Null)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let request = Request::post("/api/operations/getLearningGoals")
        .header("x-user-id", "bob")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, request).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_goal_answers_no_content() {
    let (app, _) = app();
    let (_, created) = send(&app, post("/api/operations/createGoal", Value::Null)).await;
    let id = created["id"].as_u64().unwrap();

    let (status, body) = send(&app, post("/api/operations/deleteGoal", json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, body) = send(&app, post("/api/operations/getLearningGoals", Value::Null)).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, post("/api/operations/teleport", Value::Null)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test(start_paused = true)]
async fn forwarded_fault_makes_sign_up_unavailable() {
    let (app, _) = app();
    let request = Request::post("/api/operations/signUp")
        .header("x-user-id", "carol")
        .header("fault", "100")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "unavailable");
}
