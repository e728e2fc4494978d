//! Task model.
//!
//! A task is a unit of work with a fixed duration that occupies a number
//! of units of the project's single renewable resource while it runs.
//!
//! # Reference
//! Kolisch & Sprecher (1997), "PSPLIB - A project scheduling problem library"

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A task (activity) in a project network.
///
/// # Time Representation
/// Durations are integral time units. The consumer decides what one unit
/// means (hours, shifts, days).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Processing time in time units (must be positive).
    pub duration: i64,
    /// Resource units occupied at every time unit the task runs.
    pub demand: i64,
    /// IDs of tasks that must finish before this one starts.
    pub predecessors: Vec<String>,
    /// Domain-specific key-value metadata.
    pub attributes: HashMap<String, String>,
}

impl Task {
    /// Creates a task with unit duration and no resource demand.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            duration: 1,
            demand: 0,
            predecessors: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the resource demand.
    pub fn with_demand(mut self, demand: i64) -> Self {
        self.demand = demand;
        self
    }

    /// Adds a predecessor.
    pub fn with_predecessor(mut self, task_id: impl Into<String>) -> Self {
        self.predecessors.push(task_id.into());
        self
    }

    /// Adds several predecessors.
    pub fn with_predecessors<I, S>(mut self, task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors
            .extend(task_ids.into_iter().map(Into::into));
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Resource-time product (duration × demand), saturating at the `i64` range.
    #[inline]
    pub fn energy(&self) -> i64 {
        self.duration.saturating_mul(self.demand)
    }

    /// Whether this task has no predecessors.
    pub fn is_source(&self) -> bool {
        self.predecessors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("C")
            .with_name("Pour foundation")
            .with_duration(5)
            .with_demand(4)
            .with_predecessor("A")
            .with_attribute("crew", "north");

        assert_eq!(task.id, "C");
        assert_eq!(task.name, "Pour foundation");
        assert_eq!(task.duration, 5);
        assert_eq!(task.demand, 4);
        assert_eq!(task.predecessors, vec!["A".to_string()]);
        assert_eq!(task.attributes.get("crew"), Some(&"north".to_string()));
        assert!(!task.is_source());
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new("A");
        assert_eq!(task.duration, 1);
        assert_eq!(task.demand, 0);
        assert!(task.is_source());
        assert_eq!(task.energy(), 0);
    }

    #[test]
    fn test_task_energy() {
        let task = Task::new("E").with_duration(3).with_demand(5);
        assert_eq!(task.energy(), 15);
    }

    #[test]
    fn test_with_predecessors() {
        let task = Task::new("G").with_predecessors(["E", "F"]);
        assert_eq!(task.predecessors, vec!["E".to_string(), "F".to_string()]);
    }
}
