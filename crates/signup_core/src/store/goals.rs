use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{Duration as DateDelta, NaiveDate, Utc};

use crate::error::{Result, SignupError};
use crate::fault::{FaultDirective, FaultInjector};
use crate::odata::GoalQuery;
use crate::types::{
    Goal, GoalPermission, GoalTask, NewGoal, NewTask, Results, GOAL_DUE_DAYS, STATE_ON_TRACK,
};

type Shared<T> = Arc<Mutex<Vec<T>>>;

/// In-memory HR goal service.
///
/// Goals are kept per user and tasks per goal; every list has its own lock so
/// work on unrelated users and goals proceeds concurrently. Fault injection
/// runs before any lock is taken.
pub struct MockGoalStore {
    injector: FaultInjector,
    next_goal_id: AtomicU64,
    next_task_id: AtomicU64,
    goals: RwLock<HashMap<String, Shared<Goal>>>,
    tasks: RwLock<HashMap<u64, Shared<GoalTask>>>,
}

impl MockGoalStore {
    pub fn new() -> Self {
        Self::with_injector(FaultInjector::new())
    }

    pub fn with_injector(injector: FaultInjector) -> Self {
        Self {
            injector,
            next_goal_id: AtomicU64::new(1),
            next_task_id: AtomicU64::new(1),
            goals: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Visible goals matching `query`, at most `query.limit()` of them.
    pub async fn list_goals(&self, query: &GoalQuery, faults: &FaultDirective) -> Result<Vec<Goal>> {
        self.injector.apply(faults).await?;

        let lists: Vec<Shared<Goal>> = {
            let goals = self.goals.read().unwrap_or_else(|p| p.into_inner());
            match query.user_id() {
                Some(user) => goals.get(user).cloned().into_iter().collect(),
                None => goals.values().cloned().collect(),
            }
        };

        let mut found = Vec::new();
        for list in lists {
            let list = lock(&list);
            found.extend(
                list.iter()
                    .filter(|g| g.is_visible() && query.matches(g))
                    .cloned(),
            );
        }
        found.truncate(query.limit());

        for goal in &mut found {
            goal.tasks = Results {
                results: self.tasks_of(goal.id),
            };
        }
        Ok(found)
    }

    pub fn get_goal(&self, goal_id: u64) -> Result<Goal> {
        let lists: Vec<Shared<Goal>> = self
            .goals
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect();
        let mut goal = lists
            .iter()
            .find_map(|list| lock(list).iter().find(|g| g.id == goal_id).cloned())
            .ok_or_else(|| SignupError::NotFound(format!("goal {goal_id}")))?;
        goal.tasks = Results {
            results: self.tasks_of(goal_id),
        };
        Ok(goal)
    }

    pub async fn create_goal(&self, draft: NewGoal, faults: &FaultDirective) -> Result<Goal> {
        self.injector.apply(faults).await?;

        let user_id = draft
            .user_id
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SignupError::InvalidInput("userId is required".into()))?;

        let start = draft.start.unwrap_or_else(today);
        let goal = Goal {
            id: self.next_goal_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            name: draft.name,
            metric: draft.metric,
            category: draft.category,
            kind: draft.kind,
            flag: draft.flag,
            weight: draft.weight,
            done: draft.done,
            state: draft.state.unwrap_or_else(|| STATE_ON_TRACK.to_string()),
            start: Some(start),
            due: Some(draft.due.unwrap_or(start + DateDelta::days(GOAL_DUE_DAYS))),
            permission_nav: GoalPermission { view: true },
            tasks: Results::default(),
        };
        self.insert_goal(goal.clone());
        tracing::debug!(goal_id = goal.id, user = %goal.user_id, "goal created");
        Ok(goal)
    }

    pub async fn create_task(&self, draft: NewTask, faults: &FaultDirective) -> Result<GoalTask> {
        self.injector.apply(faults).await?;

        let obj_id = draft
            .obj_id
            .ok_or_else(|| SignupError::InvalidInput("objId is required".into()))?;
        let task = GoalTask {
            id: self.next_task_id.fetch_add(1, Ordering::Relaxed),
            obj_id,
            description: draft.description,
            done: draft.done,
        };

        let list = self
            .tasks
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .entry(obj_id)
            .or_default()
            .clone();
        lock(&list).push(task.clone());
        tracing::debug!(task_id = task.id, goal_id = obj_id, "task created");
        Ok(task)
    }

    /// Remove a goal and its tasks. Unknown ids are ignored.
    pub fn delete_goal(&self, goal_id: u64) {
        let lists: Vec<Shared<Goal>> = self
            .goals
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect();
        let mut removed = false;
        for list in lists {
            let mut list = lock(&list);
            let before = list.len();
            list.retain(|g| g.id != goal_id);
            removed |= list.len() != before;
        }
        if removed {
            self.tasks
                .write()
                .unwrap_or_else(|p| p.into_inner())
                .remove(&goal_id);
            tracing::debug!(goal_id, "goal deleted");
        }
    }

    /// Remove a task from whichever goal holds it. Unknown ids are ignored.
    pub fn delete_task(&self, task_id: u64) {
        let lists: Vec<Shared<GoalTask>> = self
            .tasks
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect();
        for list in lists {
            lock(&list).retain(|t| t.id != task_id);
        }
    }

    /// Insert a fully specified goal, e.g. a hidden or completed one. A zero id
    /// is replaced by a fresh one; explicit ids advance the counter past them.
    pub fn seed_goal(&self, mut goal: Goal) -> Goal {
        if goal.id == 0 {
            goal.id = self.next_goal_id.fetch_add(1, Ordering::Relaxed);
        } else {
            self.next_goal_id.fetch_max(goal.id + 1, Ordering::Relaxed);
        }
        goal.tasks = Results::default();
        self.insert_goal(goal.clone());
        goal
    }

    fn insert_goal(&self, goal: Goal) {
        let list = self
            .goals
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .entry(goal.user_id.clone())
            .or_default()
            .clone();
        lock(&list).push(goal);
    }

    fn tasks_of(&self, goal_id: u64) -> Vec<GoalTask> {
        let list = self
            .tasks
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&goal_id)
            .cloned();
        match list {
            Some(list) => {
                let tasks = lock(&list).clone();
                tasks
            }
            None => Vec::new(),
        }
    }
}

impl Default for MockGoalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(list: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
    list.lock().unwrap_or_else(|p| p.into_inner())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
