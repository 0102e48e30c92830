use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fault::FaultDirective;

// ─── Well-known values ────────────────────────────────────────

/// Name of the conference every signup registers for.
pub const CONFERENCE_NAME: &str = "TechEd 2023";

/// Session used when a signup request does not name one.
pub const DEFAULT_SESSION: &str = "Opening Keynote";

/// Goal category the workflow reads and writes.
pub const LEARNING_CATEGORY: &str = "Learning and Growth";

/// Goal name suffix; the full name is `"<demo id>: <suffix>"`.
pub const LEARNING_GOAL_NAME: &str = "Learn something at TechEd 2023";

pub const STATE_ON_TRACK: &str = "On Track";
pub const STATE_COMPLETED: &str = "Completed";

/// Days between a new goal's start and due date.
pub const GOAL_DUE_DAYS: i64 = 14;

/// Progress recorded on a freshly created task.
pub const TASK_INITIAL_DONE: f64 = 10.0;

// ─── Registration service ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub name: String,
    #[serde(rename = "sessionIDs", alias = "sessionIds", default)]
    pub session_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: u64,
    pub title: String,
    /// Minutes.
    pub duration: u32,
    pub location: String,
    pub event_id: u64,
}

/// One recorded signup. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    pub participant: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub event_id: Option<u64>,
    pub participant: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSessionRequest {
    pub event_id: Option<u64>,
    pub session_id: Option<u64>,
    pub participant: Option<String>,
}

// ─── Goal service ─────────────────────────────────────────────

/// Downstream ACL attached to every goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoalPermission {
    pub view: bool,
}

/// OData collection wrapper: `{"results": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

impl<T> Default for Results<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

/// OData response envelope: `{"d": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub d: T,
}

impl<T> Envelope<T> {
    pub fn new(d: T) -> Self {
        Self { d }
    }
}

impl<T> Envelope<Results<T>> {
    pub fn results(results: Vec<T>) -> Self {
        Self {
            d: Results { results },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub metric: Option<String>,
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub flag: i32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub done: f64,
    pub state: String,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub permission_nav: GoalPermission,
    #[serde(default)]
    pub tasks: Results<GoalTask>,
}

impl Goal {
    pub fn is_visible(&self) -> bool {
        self.permission_nav.view
    }
}

/// Body of `POST /Goal_101`. Every field is optional on the wire so the mock can
/// report the missing ones itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewGoal {
    pub user_id: Option<String>,
    pub name: String,
    pub metric: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub flag: i32,
    pub weight: f64,
    pub done: f64,
    pub state: Option<String>,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTask {
    pub id: u64,
    pub obj_id: u64,
    pub description: String,
    #[serde(default)]
    pub done: f64,
}

/// Body of `POST /GoalTask_101`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTask {
    pub obj_id: Option<u64>,
    pub description: String,
    pub done: f64,
}

/// Compact view of a goal handed back by the goal operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
}

impl From<&Goal> for GoalSummary {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id,
            title: goal.name.clone(),
            description: goal.metric.clone(),
        }
    }
}

// ─── Error body ───────────────────────────────────────────────

/// JSON body of every non-2xx response: `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

// ─── Call context ─────────────────────────────────────────────

/// Who is calling, plus the fault directive that travels with the request.
///
/// Services and the orchestrator only forward `faults`; mocks are the only
/// place that acts on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub user_id: String,
    pub faults: FaultDirective,
}

impl CallContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            faults: FaultDirective::default(),
        }
    }

    pub fn with_faults(mut self, faults: FaultDirective) -> Self {
        self.faults = faults;
        self
    }
}
