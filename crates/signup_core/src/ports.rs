//! Client port traits for the two downstream services.
//!
//! The services and the orchestrator depend only on these traits.
//! `signup_client` implements them in-process (against the mock stores) and
//! over HTTP (against the mock endpoints).

use async_trait::async_trait;

use crate::error::Result;
use crate::odata::GoalQuery;
use crate::types::{CallContext, Event, Goal, GoalTask, NewGoal, NewTask, Registration, Session};

/// Conference registration system.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>>;

    async fn get_event(&self, event_id: u64) -> Result<Event>;

    /// Sessions of one event. NotFound when the event is unknown.
    async fn list_sessions(&self, event_id: u64) -> Result<Vec<Session>>;

    async fn register_for_event(&self, event_id: u64, participant: &str) -> Result<()>;

    async fn register_for_session(
        &self,
        event_id: u64,
        session_id: u64,
        participant: &str,
    ) -> Result<()>;

    /// Registrations recorded so far for one event.
    async fn registrations(&self, event_id: u64) -> Result<Vec<Registration>>;
}

/// HR goal system.
///
/// Every call carries the caller's [`CallContext`]; its fault directive is
/// forwarded untouched to whatever sits behind the client.
#[async_trait]
pub trait GoalClient: Send + Sync {
    /// Visible goals matching `query`, each with its task list.
    async fn list_goals(&self, ctx: &CallContext, query: &GoalQuery) -> Result<Vec<Goal>>;

    async fn get_goal(&self, ctx: &CallContext, goal_id: u64) -> Result<Goal>;

    async fn create_goal(&self, ctx: &CallContext, draft: &NewGoal) -> Result<Goal>;

    async fn create_task(&self, ctx: &CallContext, draft: &NewTask) -> Result<GoalTask>;

    /// Unknown ids are not an error.
    async fn delete_goal(&self, ctx: &CallContext, goal_id: u64) -> Result<()>;

    /// Unknown ids are not an error.
    async fn delete_task(&self, ctx: &CallContext, task_id: u64) -> Result<()>;
}
