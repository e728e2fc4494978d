//! Project model.
//!
//! A project is the complete input of one scheduling run: the task
//! network plus the capacity of the shared renewable resource and the
//! planning horizon.

use serde::{Deserialize, Serialize};

use super::Task;

/// A single-resource project scheduling instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project name (used for model naming and logging).
    pub name: String,
    /// Tasks in declaration order.
    pub tasks: Vec<Task>,
    /// Resource units available at every time unit.
    pub capacity: i64,
    /// Upper bound on the makespan. `None` = sum of all durations.
    pub horizon: Option<i64>,
}

impl Project {
    /// Creates an empty project with the given resource capacity.
    pub fn new(capacity: i64) -> Self {
        Self {
            name: String::new(),
            tasks: Vec::new(),
            capacity,
            horizon: None,
        }
    }

    /// Sets the project name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds several tasks.
    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Overrides the planning horizon.
    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the resource capacity.
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Effective planning horizon.
    ///
    /// Defaults to the sum of all durations: running every task one after
    /// another is always resource-feasible when no single task exceeds
    /// capacity, so no optimal schedule can be longer.
    pub fn horizon(&self) -> i64 {
        self.horizon.unwrap_or_else(|| self.total_duration())
    }

    /// Sum of all task durations, saturating at `i64::MAX`.
    ///
    /// Validation rejects projects whose exact sum does not fit.
    pub fn total_duration(&self) -> i64 {
        self.tasks
            .iter()
            .fold(0i64, |acc, t| acc.saturating_add(t.duration))
    }

    /// Sum of duration × demand over all tasks, saturating at `i64::MAX`.
    pub fn total_energy(&self) -> i64 {
        self.tasks
            .iter()
            .fold(0i64, |acc, t| acc.saturating_add(t.energy()))
    }

    /// Finds a task by ID.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the project has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
