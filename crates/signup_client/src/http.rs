//! Clients for the mock endpoints over HTTP.
//!
//! Non-2xx responses are mapped back onto `SignupError` by status: 400 is a
//! validation error, 404 not found, 5xx and transport failures transient.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use signup_core::error::SignupError;
use signup_core::odata::GoalQuery;
use signup_core::ports::{GoalClient, RegistrationClient};
use signup_core::types::{
    CallContext, Envelope, ErrorBody, Event, Goal, GoalTask, NewGoal, NewTask, Registration,
    Results, Session,
};

use crate::Result;

fn build_http(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

fn transport(err: reqwest::Error) -> SignupError {
    SignupError::Transient(format!("request failed: {err}"))
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::debug!(%status, url = %response.url(), "upstream returned an error");

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(200).collect(),
    };
    Err(match status {
        StatusCode::BAD_REQUEST => SignupError::InvalidInput(message),
        StatusCode::NOT_FOUND => SignupError::NotFound(message),
        s if s.is_server_error() => SignupError::Transient(format!("{s}: {message}")),
        s => SignupError::Internal(anyhow::anyhow!("unexpected status {s}: {message}")),
    })
}

async fn read<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = send(request).await?;
    let url = response.url().clone();
    Ok(response
        .json()
        .await
        .with_context(|| format!("Failed to parse response from {url}"))?)
}

// ── Registration ──────────────────────────────────────────────

pub struct HttpRegistrationClient {
    http: Client,
    base_url: String,
}

impl HttpRegistrationClient {
    /// `base_url` is the mount point of the registration mock, e.g.
    /// `http://localhost:8080/registration`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RegistrationClient for HttpRegistrationClient {
    async fn list_events(&self) -> Result<Vec<Event>> {
        read(self.http.get(self.url("/events"))).await
    }

    async fn get_event(&self, event_id: u64) -> Result<Event> {
        read(self.http.get(self.url(&format!("/events/{event_id}")))).await
    }

    async fn list_sessions(&self, event_id: u64) -> Result<Vec<Session>> {
        read(
            self.http
                .get(self.url("/sessions"))
                .query(&[("eventId", event_id)]),
        )
        .await
    }

    async fn register_for_event(&self, event_id: u64, participant: &str) -> Result<()> {
        let body = json!({ "eventId": event_id, "participant": participant });
        send(self.http.post(self.url("/register")).json(&body)).await?;
        Ok(())
    }

    async fn register_for_session(
        &self,
        event_id: u64,
        session_id: u64,
        participant: &str,
    ) -> Result<()> {
        let body = json!({
            "eventId": event_id,
            "sessionId": session_id,
            "participant": participant,
        });
        send(self.http.post(self.url("/registerSession")).json(&body)).await?;
        Ok(())
    }

    async fn registrations(&self, event_id: u64) -> Result<Vec<Registration>> {
        read(
            self.http
                .get(self.url("/registrations"))
                .query(&[("eventId", event_id)]),
        )
        .await
    }
}

// ── Goals ─────────────────────────────────────────────────────

/// OData v2 goal service client. The caller's fault directive travels as the
/// `delay` / `fault` headers.
pub struct HttpGoalClient {
    http: Client,
    base_url: String,
}

impl HttpGoalClient {
    /// `base_url` is the OData root, e.g. `http://localhost:8080/odata/v2`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    fn with_faults(&self, request: RequestBuilder, ctx: &CallContext) -> RequestBuilder {
        let mut request = request.header("Accept", "application/json");
        if let Some(ms) = ctx.faults.delay_ms {
            request = request.header("delay", ms.to_string());
        }
        if let Some(percent) = ctx.faults.fail_percent {
            request = request.header("fault", percent.to_string());
        }
        request
    }
}

#[async_trait]
impl GoalClient for HttpGoalClient {
    async fn list_goals(&self, ctx: &CallContext, query: &GoalQuery) -> Result<Vec<Goal>> {
        let mut params = vec![("$top", query.limit().to_string())];
        if let Some(filter) = query.to_odata_filter() {
            params.push(("$filter", filter));
        }
        let request = self.http.get(self.url("Goal_101")).query(&params);
        let envelope: Envelope<Results<Goal>> = read(self.with_faults(request, ctx)).await?;
        Ok(envelope.d.results)
    }

    async fn get_goal(&self, ctx: &CallContext, goal_id: u64) -> Result<Goal> {
        let request = self.http.get(self.url(&format!("Goal_101({goal_id})")));
        let envelope: Envelope<Goal> = read(self.with_faults(request, ctx)).await?;
        Ok(envelope.d)
    }

    async fn create_goal(&self, ctx: &CallContext, draft: &NewGoal) -> Result<Goal> {
        let request = self.http.post(self.url("Goal_101")).json(draft);
        let envelope: Envelope<Goal> = read(self.with_faults(request, ctx)).await?;
        Ok(envelope.d)
    }

    async fn create_task(&self, ctx: &CallContext, draft: &NewTask) -> Result<GoalTask> {
        let request = self.http.post(self.url("GoalTask_101")).json(draft);
        let envelope: Envelope<GoalTask> = read(self.with_faults(request, ctx)).await?;
        Ok(envelope.d)
    }

    async fn delete_goal(&self, ctx: &CallContext, goal_id: u64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("Goal_101({goal_id})")));
        send(self.with_faults(request, ctx)).await?;
        Ok(())
    }

    async fn delete_task(&self, ctx: &CallContext, task_id: u64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("GoalTask_101({task_id})")));
        send(self.with_faults(request, ctx)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = HttpGoalClient::new("http://localhost:8080/odata/v2/", Duration::from_secs(30))
            .unwrap();
        assert_eq!(client.url("Goal_101"), "http://localhost:8080/odata/v2/Goal_101");

        let client =
            HttpRegistrationClient::new("http://localhost:8080/registration/", Duration::from_secs(30))
                .unwrap();
        assert_eq!(client.url("/events"), "http://localhost:8080/registration/events");
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        // Bind and release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = HttpRegistrationClient::new(
            format!("http://127.0.0.1:{port}/registration"),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.list_events().await.unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }
}
