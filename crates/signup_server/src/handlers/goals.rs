//! OData v2 goal mock, mounted at `/odata/v2`.
//!
//! Every entity set and entity key arrives as one path segment
//! (`Goal_101`, `Goal_101(42)`), so a single `/:resource` route fans out
//! by method.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use signup_core::odata::GoalQuery;
use signup_core::types::{Envelope, NewGoal, NewTask};
use signup_core::SignupError;

use crate::error::AppError;
use crate::extract::Faults;
use crate::state::AppState;

pub const GOAL_SET: &str = "Goal_101";
pub const TASK_SET: &str = "GoalTask_101";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Goals,
    Goal(u64),
    Tasks,
    Task(u64),
}

impl FromStr for Resource {
    type Err = SignupError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (set, key) = match raw.split_once('(') {
            Some((set, rest)) => {
                let key = rest.strip_suffix(')').ok_or_else(|| {
                    SignupError::InvalidInput(format!("malformed entity key in '{raw}'"))
                })?;
                let key = key.trim().trim_matches('\'');
                // Edm.Int64 literals carry an `L` suffix: `Goal_101(12L)`.
                let digits = key.strip_suffix(|c| c == 'L' || c == 'l').unwrap_or(key);
                let id = digits.parse::<u64>().map_err(|_| {
                    SignupError::InvalidInput(format!("invalid entity key '{key}'"))
                })?;
                (set, Some(id))
            }
            None => (raw, None),
        };
        match (set, key) {
            (GOAL_SET, None) => Ok(Self::Goals),
            (GOAL_SET, Some(id)) => Ok(Self::Goal(id)),
            (TASK_SET, None) => Ok(Self::Tasks),
            (TASK_SET, Some(id)) => Ok(Self::Task(id)),
            _ => Err(SignupError::NotFound(format!("resource '{set}'"))),
        }
    }
}

fn unsupported(method: &str, resource: &str) -> AppError {
    SignupError::InvalidInput(format!("{method} is not supported on '{resource}'")).into()
}

/// GET: the goal collection (`$filter`, `$top`) or a single goal.
pub async fn read(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Faults(faults): Faults,
) -> Result<Response, AppError> {
    match resource.parse::<Resource>()? {
        Resource::Goals => {
            let query = GoalQuery::from_odata(
                params.get("$filter").map(String::as_str),
                params.get("$top").map(String::as_str),
            )?;
            let goals = state.goals.list_goals(&query, &faults).await?;
            tracing::debug!(count = goals.len(), "listed goals");
            Ok(Json(Envelope::results(goals)).into_response())
        }
        Resource::Goal(id) => Ok(Json(Envelope::new(state.goals.get_goal(id)?)).into_response()),
        Resource::Tasks | Resource::Task(_) => Err(unsupported("GET", &resource)),
    }
}

/// POST: create a goal or a task.
pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Faults(faults): Faults,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body?;
    match resource.parse::<Resource>()? {
        Resource::Goals => {
            let draft: NewGoal = serde_json::from_value(body)?;
            let goal = state.goals.create_goal(draft, &faults).await?;
            tracing::info!(goal_id = goal.id, user_id = %goal.user_id, "goal created");
            Ok(Json(Envelope::new(goal)).into_response())
        }
        Resource::Tasks => {
            let draft: NewTask = serde_json::from_value(body)?;
            let task = state.goals.create_task(draft, &faults).await?;
            tracing::info!(task_id = task.id, goal_id = task.obj_id, "task created");
            Ok(Json(Envelope::new(task)).into_response())
        }
        Resource::Goal(_) | Resource::Task(_) => Err(unsupported("POST", &resource)),
    }
}

/// DELETE: remove a goal (with its tasks) or a task. Unknown keys are a
/// no-op.
pub async fn remove(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<StatusCode, AppError> {
    match resource.parse::<Resource>()? {
        Resource::Goal(id) => state.goals.delete_goal(id),
        Resource::Task(id) => state.goals.delete_task(id),
        Resource::Goals | Resource::Tasks => return Err(unsupported("DELETE", &resource)),
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths() {
        assert_eq!("Goal_101".parse::<Resource>().unwrap(), Resource::Goals);
        assert_eq!("Goal_101(42)".parse::<Resource>().unwrap(), Resource::Goal(42));
        assert_eq!("GoalTask_101('7')".parse::<Resource>().unwrap(), Resource::Task(7));
        assert_eq!("GoalTask_101".parse::<Resource>().unwrap(), Resource::Tasks);
    }

    #[test]
    fn int64_key_suffix_is_accepted() {
        assert_eq!("Goal_101(12L)".parse::<Resource>().unwrap(), Resource::Goal(12));
        assert_eq!("GoalTask_101(7l)".parse::<Resource>().unwrap(), Resource::Task(7));
        assert!(matches!(
            "Goal_101(12LL)".parse::<Resource>(),
            Err(SignupError::InvalidInput(_))
        ));
        assert!(matches!(
            "Goal_101(L)".parse::<Resource>(),
            Err(SignupError::InvalidInput(_))
        ));
    }

    #[test]
    fn bad_resource_paths() {
        assert!(matches!(
            "Goal_102".parse::<Resource>(),
            Err(SignupError::NotFound(_))
        ));
        assert!(matches!(
            "Goal_101(abc)".parse::<Resource>(),
            Err(SignupError::InvalidInput(_))
        ));
        assert!(matches!(
            "Goal_101(1".parse::<Resource>(),
            Err(SignupError::InvalidInput(_))
        ));
    }
}
