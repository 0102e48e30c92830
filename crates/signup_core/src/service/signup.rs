//! The signup workflow.
//!
//! ```text
//! START → REGISTER_EVENT → REGISTER_SESSION → LOOKUP_GOAL ─┬─ GOAL_FOUND ──┬→ CREATE_TASK → DONE
//!                                                          └─ CREATE_GOAL ─┘
//! ```
//!
//! Registration steps are direct calls; any failure aborts the workflow. Only
//! the goal lookup runs under the resilience policy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{GoalService, RegistrationService};
use crate::error::{Result, SignupError};
use crate::resilience::ResiliencePolicy;
use crate::types::{CallContext, Goal, DEFAULT_SESSION, LEARNING_CATEGORY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Start,
    RegisterEvent,
    RegisterSession,
    LookupGoal,
    GoalFound,
    CreateGoal,
    CreateTask,
    Done,
}

impl SignupStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::RegisterEvent => "REGISTER_EVENT",
            Self::RegisterSession => "REGISTER_SESSION",
            Self::LookupGoal => "LOOKUP_GOAL",
            Self::GoalFound => "GOAL_FOUND",
            Self::CreateGoal => "CREATE_GOAL",
            Self::CreateTask => "CREATE_TASK",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for SignupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the guarded goal lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalLookup {
    Found(Goal),
    Absent,
    /// The policy gave up; carries the reason.
    Failed(String),
}

/// What to do when the goal lookup fails outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Fail the signup.
    #[default]
    Abort,
    /// Treat the failure as "no goal" and create one.
    CreateGoal,
}

impl std::str::FromStr for LookupFailurePolicy {
    type Err = SignupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "create_goal" | "create-goal" => Ok(Self::CreateGoal),
            other => Err(SignupError::InvalidInput(format!(
                "unknown lookup failure policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupOutcome {
    pub message: String,
    pub session: String,
    pub goal_id: u64,
    pub task_id: u64,
    pub goal_created: bool,
}

pub struct SignupOrchestrator {
    registration: Arc<RegistrationService>,
    goals: Arc<GoalService>,
    lookup_policy: Arc<ResiliencePolicy>,
    on_lookup_failure: LookupFailurePolicy,
}

impl SignupOrchestrator {
    pub fn new(
        registration: Arc<RegistrationService>,
        goals: Arc<GoalService>,
        lookup_policy: Arc<ResiliencePolicy>,
    ) -> Self {
        Self {
            registration,
            goals,
            lookup_policy,
            on_lookup_failure: LookupFailurePolicy::default(),
        }
    }

    pub fn on_lookup_failure(mut self, policy: LookupFailurePolicy) -> Self {
        self.on_lookup_failure = policy;
        self
    }

    pub fn goals(&self) -> &Arc<GoalService> {
        &self.goals
    }

    pub fn lookup_policy(&self) -> &Arc<ResiliencePolicy> {
        &self.lookup_policy
    }

    /// Register `ctx.user_id` for the conference and a session (default
    /// "Opening Keynote") and record the attendance as a goal task.
    pub async fn sign_up(&self, ctx: &CallContext, session: Option<&str>) -> Result<SignupOutcome> {
        let requested = session
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION);
        let user = ctx.user_id.as_str();
        if user.trim().is_empty() {
            return Err(SignupError::InvalidInput("user is required".into()));
        }
        tracing::info!(step = %SignupStep::Start, user, session = requested, "signup started");

        tracing::info!(step = %SignupStep::RegisterEvent, user);
        self.registration.sign_up_for_conference(user).await?;

        tracing::info!(step = %SignupStep::RegisterSession, user, session = requested);
        let session = self.registration.sign_up_for_session(requested, user).await?;

        tracing::info!(step = %SignupStep::LookupGoal, user);
        let (goal, goal_created) = match self.lookup_goal(ctx).await {
            GoalLookup::Found(goal) => {
                tracing::info!(step = %SignupStep::GoalFound, goal_id = goal.id);
                (goal, false)
            }
            GoalLookup::Absent => (self.create_goal(ctx).await?, true),
            GoalLookup::Failed(reason) => match self.on_lookup_failure {
                LookupFailurePolicy::Abort => {
                    tracing::warn!(user, %reason, "goal lookup failed, aborting signup");
                    return Err(SignupError::Unavailable(format!("goal lookup failed: {reason}")));
                }
                LookupFailurePolicy::CreateGoal => {
                    tracing::warn!(user, %reason, "goal lookup failed, creating a new goal");
                    (self.create_goal(ctx).await?, true)
                }
            },
        };

        tracing::info!(step = %SignupStep::CreateTask, goal_id = goal.id);
        let task = self
            .goals
            .create_session_task(ctx, goal.id, &session.title)
            .await?;

        tracing::info!(
            step = %SignupStep::Done,
            user,
            goal_id = goal.id,
            task_id = task.id,
            goal_created,
            "signup complete"
        );
        Ok(SignupOutcome {
            message: confirmation(&session.title),
            session: session.title,
            goal_id: goal.id,
            task_id: task.id,
            goal_created,
        })
    }

    /// Goal lookup under the resilience policy.
    pub async fn lookup_goal(&self, ctx: &CallContext) -> GoalLookup {
        match self
            .lookup_policy
            .execute(|| self.goals.learning_goal(ctx))
            .await
        {
            Ok(Some(goal)) => GoalLookup::Found(goal),
            Ok(None) => GoalLookup::Absent,
            Err(err) => GoalLookup::Failed(err.to_string()),
        }
    }

    async fn create_goal(&self, ctx: &CallContext) -> Result<Goal> {
        tracing::info!(step = %SignupStep::CreateGoal, user = %ctx.user_id);
        self.goals.create_goal(ctx).await
    }
}

/// Text returned to the caller on success.
pub fn confirmation(session: &str) -> String {
    format!(
        "Yay, we successfully signed you up for the session: {session}.\n\
         Also, we created an entry in your '{LEARNING_CATEGORY}' section in the HR system \
         to reflect your efforts."
    )
}
