use std::sync::Arc;

use chrono::{Duration as DateDelta, Utc};

use crate::error::Result;
use crate::odata::{GoalField, GoalFilter, GoalQuery};
use crate::ports::GoalClient;
use crate::types::{
    CallContext, Goal, GoalSummary, GoalTask, NewGoal, NewTask, CONFERENCE_NAME, GOAL_DUE_DAYS,
    LEARNING_CATEGORY, LEARNING_GOAL_NAME, STATE_COMPLETED, STATE_ON_TRACK, TASK_INITIAL_DONE,
};

/// The caller's "learning" goal in the HR system.
pub struct GoalService {
    client: Arc<dyn GoalClient>,
    demo_id: String,
}

impl GoalService {
    pub fn new(client: Arc<dyn GoalClient>, demo_id: impl Into<String>) -> Self {
        Self {
            client,
            demo_id: demo_id.into(),
        }
    }

    pub fn demo_id(&self) -> &str {
        &self.demo_id
    }

    pub fn learning_goal_name(&self) -> String {
        format!("{}: {LEARNING_GOAL_NAME}", self.demo_id)
    }

    /// Open learning goals of `user_id` created under this demo id.
    pub fn learning_goal_query(&self, user_id: &str) -> GoalQuery {
        GoalQuery::for_user(user_id)
            .filter(GoalFilter::eq(GoalField::Category, LEARNING_CATEGORY))
            .filter(GoalFilter::contains(GoalField::Name, LEARNING_GOAL_NAME))
            .filter(GoalFilter::starts_with(GoalField::Name, &self.demo_id))
            .filter(GoalFilter::ne(GoalField::State, STATE_COMPLETED))
    }

    pub async fn learning_goals(&self, ctx: &CallContext) -> Result<Vec<Goal>> {
        let query = self.learning_goal_query(&ctx.user_id);
        let goals: Vec<Goal> = self
            .client
            .list_goals(ctx, &query)
            .await?
            .into_iter()
            .filter(Goal::is_visible)
            .collect();
        for goal in &goals {
            tracing::debug!(goal_id = goal.id, name = %goal.name, "learning goal");
        }
        Ok(goals)
    }

    /// First open learning goal, if any.
    pub async fn learning_goal(&self, ctx: &CallContext) -> Result<Option<Goal>> {
        Ok(self.learning_goals(ctx).await?.into_iter().next())
    }

    pub fn draft_goal(&self, user_id: &str) -> NewGoal {
        let today = Utc::now().date_naive();
        NewGoal {
            user_id: Some(user_id.to_string()),
            name: self.learning_goal_name(),
            metric: Some(format!("Attend sessions at {CONFERENCE_NAME}")),
            category: LEARNING_CATEGORY.to_string(),
            kind: Some("user".to_string()),
            flag: 0,
            weight: 0.0,
            done: 0.0,
            state: Some(STATE_ON_TRACK.to_string()),
            start: Some(today),
            due: Some(today + DateDelta::days(GOAL_DUE_DAYS)),
        }
    }

    pub async fn create_goal(&self, ctx: &CallContext) -> Result<Goal> {
        let goal = self
            .client
            .create_goal(ctx, &self.draft_goal(&ctx.user_id))
            .await?;
        tracing::info!(goal_id = goal.id, user = %ctx.user_id, "created learning goal");
        Ok(goal)
    }

    pub async fn create_session_task(
        &self,
        ctx: &CallContext,
        goal_id: u64,
        session_title: &str,
    ) -> Result<GoalTask> {
        let draft = NewTask {
            obj_id: Some(goal_id),
            description: format!("Attend the session '{session_title}' and share what you learned!"),
            done: TASK_INITIAL_DONE,
        };
        self.client.create_task(ctx, &draft).await
    }

    pub async fn delete_goal(&self, ctx: &CallContext, goal_id: u64) -> Result<()> {
        self.client.delete_goal(ctx, goal_id).await
    }

    pub async fn summaries(&self, ctx: &CallContext) -> Result<Vec<GoalSummary>> {
        Ok(self
            .learning_goals(ctx)
            .await?
            .iter()
            .map(GoalSummary::from)
            .collect())
    }
}
