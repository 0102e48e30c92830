//! Clients that call the mock stores in the same process.

use std::sync::Arc;

use async_trait::async_trait;
use signup_core::odata::GoalQuery;
use signup_core::ports::{GoalClient, RegistrationClient};
use signup_core::store::{MockGoalStore, MockRegistrationStore};
use signup_core::types::{
    CallContext, Event, Goal, GoalTask, NewGoal, NewTask, Registration, Session,
};

use crate::Result;

pub struct InProcessRegistrationClient {
    store: Arc<MockRegistrationStore>,
}

impl InProcessRegistrationClient {
    pub fn new(store: Arc<MockRegistrationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RegistrationClient for InProcessRegistrationClient {
    async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.store.list_events())
    }

    async fn get_event(&self, event_id: u64) -> Result<Event> {
        self.store.get_event(event_id)
    }

    async fn list_sessions(&self, event_id: u64) -> Result<Vec<Session>> {
        self.store.list_sessions(event_id)
    }

    async fn register_for_event(&self, event_id: u64, participant: &str) -> Result<()> {
        self.store.register(event_id, participant).map(|_| ())
    }

    async fn register_for_session(
        &self,
        event_id: u64,
        session_id: u64,
        participant: &str,
    ) -> Result<()> {
        self.store
            .register_session(event_id, session_id, participant)
            .map(|_| ())
    }

    async fn registrations(&self, event_id: u64) -> Result<Vec<Registration>> {
        self.store.registrations(event_id)
    }
}

/// Fault directives reach the store on list, goal create and task create,
/// the same calls the HTTP mock honours them on.
pub struct InProcessGoalClient {
    store: Arc<MockGoalStore>,
}

impl InProcessGoalClient {
    pub fn new(store: Arc<MockGoalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl GoalClient for InProcessGoalClient {
    async fn list_goals(&self, ctx: &CallContext, query: &GoalQuery) -> Result<Vec<Goal>> {
        self.store.list_goals(query, &ctx.faults).await
    }

    async fn get_goal(&self, _ctx: &CallContext, goal_id: u64) -> Result<Goal> {
        self.store.get_goal(goal_id)
    }

    async fn create_goal(&self, ctx: &CallContext, draft: &NewGoal) -> Result<Goal> {
        self.store.create_goal(draft.clone(), &ctx.faults).await
    }

    async fn create_task(&self, ctx: &CallContext, draft: &NewTask) -> Result<GoalTask> {
        self.store.create_task(draft.clone(), &ctx.faults).await
    }

    async fn delete_goal(&self, _ctx: &CallContext, goal_id: u64) -> Result<()> {
        self.store.delete_goal(goal_id);
        Ok(())
    }

    async fn delete_task(&self, _ctx: &CallContext, task_id: u64) -> Result<()> {
        self.store.delete_task(task_id);
        Ok(())
    }
}
