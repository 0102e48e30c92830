//! Named operations and the dispatcher that routes calls to them.
//!
//! Operations take and return JSON so one HTTP route can serve all of them.
//! `null` input decodes to the operation's default input.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SignupError};
use crate::service::{GoalService, SignupOrchestrator};
use crate::types::{CallContext, GoalSummary};

pub const SIGN_UP: &str = "signUp";
pub const GET_LEARNING_GOALS: &str = "getLearningGoals";
pub const CREATE_GOAL: &str = "createGoal";
pub const DELETE_GOAL: &str = "deleteGoal";

/// Handler for one named operation.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Operation name this handler serves.
    fn operation(&self) -> &str;

    async fn handle(&self, ctx: CallContext, input: Value) -> Result<Value>;
}

/// Registry mapping operation names to handlers.
#[derive(Default)]
pub struct OperationRegistry {
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn OperationHandler>) {
        self.handlers.insert(handler.operation().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn OperationHandler>> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `signUp`, `getLearningGoals`, `createGoal` and `deleteGoal`.
    pub fn signup(orchestrator: Arc<SignupOrchestrator>) -> Self {
        let goals = orchestrator.goals().clone();
        let mut registry = Self::new();
        registry.register(Arc::new(SignUpHandler { orchestrator }));
        registry.register(Arc::new(GetLearningGoalsHandler {
            goals: goals.clone(),
        }));
        registry.register(Arc::new(CreateGoalHandler {
            goals: goals.clone(),
        }));
        registry.register(Arc::new(DeleteGoalHandler { goals }));
        registry
    }
}

pub struct Dispatcher {
    registry: OperationRegistry,
}

impl Dispatcher {
    pub fn new(registry: OperationRegistry) -> Self {
        Self { registry }
    }

    pub fn operations(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub async fn dispatch(&self, operation: &str, ctx: CallContext, input: Value) -> Result<Value> {
        let handler = self
            .registry
            .get(operation)
            .ok_or_else(|| SignupError::NotFound(format!("operation '{operation}'")))?;
        tracing::debug!(operation, user = %ctx.user_id, "dispatching");
        handler.handle(ctx, input).await
    }
}

fn decode<T: DeserializeOwned + Default>(input: Value) -> Result<T> {
    if input.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(input).map_err(|e| SignupError::InvalidInput(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(anyhow::Error::from)?)
}

// ── Handlers ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SignUpInput {
    session: Option<String>,
}

struct SignUpHandler {
    orchestrator: Arc<SignupOrchestrator>,
}

#[async_trait]
impl OperationHandler for SignUpHandler {
    fn operation(&self) -> &str {
        SIGN_UP
    }

    async fn handle(&self, ctx: CallContext, input: Value) -> Result<Value> {
        let input: SignUpInput = decode(input)?;
        let outcome = self
            .orchestrator
            .sign_up(&ctx, input.session.as_deref())
            .await?;
        encode(&outcome)
    }
}

struct GetLearningGoalsHandler {
    goals: Arc<GoalService>,
}

#[async_trait]
impl OperationHandler for GetLearningGoalsHandler {
    fn operation(&self) -> &str {
        GET_LEARNING_GOALS
    }

    async fn handle(&self, ctx: CallContext, _input: Value) -> Result<Value> {
        encode(&self.goals.summaries(&ctx).await?)
    }
}

/// Creates the demo goal for the caller; the input is ignored.
struct CreateGoalHandler {
    goals: Arc<GoalService>,
}

#[async_trait]
impl OperationHandler for CreateGoalHandler {
    fn operation(&self) -> &str {
        CREATE_GOAL
    }

    async fn handle(&self, ctx: CallContext, _input: Value) -> Result<Value> {
        let goal = self.goals.create_goal(&ctx).await?;
        encode(&GoalSummary::from(&goal))
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeleteGoalInput {
    id: Option<u64>,
}

struct DeleteGoalHandler {
    goals: Arc<GoalService>,
}

#[async_trait]
impl OperationHandler for DeleteGoalHandler {
    fn operation(&self) -> &str {
        DELETE_GOAL
    }

    async fn handle(&self, ctx: CallContext, input: Value) -> Result<Value> {
        let input: DeleteGoalInput = decode(input)?;
        let id = input
            .id
            .ok_or_else(|| SignupError::InvalidInput("id is required".into()))?;
        self.goals.delete_goal(&ctx, id).await?;
        Ok(Value::Null)
    }
}
