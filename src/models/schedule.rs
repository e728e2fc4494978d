//! Schedule (solution) model.
//!
//! A schedule assigns a start time to every task of a project. It can be
//! checked against its project for precedence, capacity and horizon
//! violations.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Project;

/// A complete schedule (solution to a project scheduling problem).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// One entry per scheduled task.
    pub entries: Vec<ScheduledTask>,
}

/// A task placed in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Scheduled task ID.
    pub task_id: String,
    /// Start time.
    pub start: i64,
    /// Finish time (exclusive): the task occupies `[start, finish)`.
    pub finish: i64,
    /// Resource units held while running.
    pub demand: i64,
}

/// A constraint violation found by [`Schedule::verify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related task ID, or the time unit for capacity violations.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Task started before a predecessor finished.
    PrecedenceViolation,
    /// Resource usage above capacity at some time unit.
    CapacityExceeded,
    /// A project task has no entry.
    MissingTask,
    /// An entry names a task not in the project (or appears twice).
    UnknownTask,
    /// `finish - start` differs from the task's duration.
    DurationMismatch,
    /// A task finishes after the planning horizon.
    HorizonExceeded,
    /// A task starts before time zero.
    NegativeStart,
}

impl ScheduledTask {
    /// Creates a scheduled task.
    pub fn new(task_id: impl Into<String>, start: i64, finish: i64, demand: i64) -> Self {
        Self {
            task_id: task_id.into(),
            start,
            finish,
            demand,
        }
    }

    /// Duration (finish - start).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.finish - self.start
    }

    /// Whether the task occupies the resource during time unit `t`.
    #[inline]
    pub fn is_active_at(&self, t: i64) -> bool {
        self.start <= t && t < self.finish
    }
}

impl Violation {
    fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    /// Creates a precedence violation.
    pub fn precedence_violation(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::PrecedenceViolation, task_id, message)
    }

    /// Creates a capacity violation at time unit `t`.
    pub fn capacity_exceeded(t: i64, message: impl Into<String>) -> Self {
        Self::new(ViolationType::CapacityExceeded, t.to_string(), message)
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from start times given in project task order.
    ///
    /// `starts` must have one entry per task of `project`.
    pub fn from_starts(project: &Project, starts: &[i64]) -> Self {
        let entries = project
            .tasks
            .iter()
            .zip(starts)
            .map(|(task, &start)| {
                ScheduledTask::new(&task.id, start, start + task.duration, task.demand)
            })
            .collect();
        Self { entries }
    }

    /// Adds an entry.
    pub fn add_entry(&mut self, entry: ScheduledTask) {
        self.entries.push(entry);
    }

    /// Makespan: latest finish time across all entries.
    pub fn makespan(&self) -> i64 {
        self.entries.iter().map(|e| e.finish).max().unwrap_or(0)
    }

    /// Finds the entry for a task.
    pub fn entry_for(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }

    /// Start time of a task.
    pub fn start_of(&self, task_id: &str) -> Option<i64> {
        self.entry_for(task_id).map(|e| e.start)
    }

    /// Finish time of a task.
    pub fn finish_of(&self, task_id: &str) -> Option<i64> {
        self.entry_for(task_id).map(|e| e.finish)
    }

    /// Resource units in use during time unit `t`.
    pub fn usage_at(&self, t: i64) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.is_active_at(t))
            .map(|e| e.demand)
            .sum()
    }

    /// Resource usage for every time unit in `[0, makespan)`.
    pub fn usage_profile(&self) -> Vec<i64> {
        let len = self.makespan().max(0) as usize;
        let mut profile = vec![0; len];
        for e in &self.entries {
            for t in e.start.max(0)..e.finish {
                if let Some(slot) = profile.get_mut(t as usize) {
                    *slot += e.demand;
                }
            }
        }
        profile
    }

    /// Highest resource usage at any time unit.
    pub fn peak_usage(&self) -> i64 {
        self.usage_profile().into_iter().max().unwrap_or(0)
    }

    /// Entries sorted by (start, task ID).
    pub fn sorted_entries(&self) -> Vec<&ScheduledTask> {
        let mut entries: Vec<&ScheduledTask> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_id.cmp(&b.task_id)));
        entries
    }

    /// Number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Checks the schedule against its project.
    ///
    /// Returns every violation found; an empty list means the schedule
    /// satisfies precedence, capacity, duration and horizon constraints
    /// and covers each task exactly once.
    pub fn verify(&self, project: &Project) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut by_id: HashMap<&str, &ScheduledTask> = HashMap::new();

        for e in &self.entries {
            if project.task(&e.task_id).is_none() {
                violations.push(Violation::new(
                    ViolationType::UnknownTask,
                    &e.task_id,
                    format!("Task '{}' is not part of the project", e.task_id),
                ));
            } else if by_id.insert(e.task_id.as_str(), e).is_some() {
                violations.push(Violation::new(
                    ViolationType::UnknownTask,
                    &e.task_id,
                    format!("Task '{}' is scheduled more than once", e.task_id),
                ));
            }
        }

        let horizon = project.horizon();
        for task in &project.tasks {
            let Some(entry) = by_id.get(task.id.as_str()) else {
                violations.push(Violation::new(
                    ViolationType::MissingTask,
                    &task.id,
                    format!("Task '{}' is not scheduled", task.id),
                ));
                continue;
            };

            if entry.start < 0 {
                violations.push(Violation::new(
                    ViolationType::NegativeStart,
                    &task.id,
                    format!("Task '{}' starts at {}", task.id, entry.start),
                ));
            }
            if entry.duration() != task.duration || entry.demand != task.demand {
                violations.push(Violation::new(
                    ViolationType::DurationMismatch,
                    &task.id,
                    format!(
                        "Task '{}' runs [{}, {}) with demand {}, expected duration {} and demand {}",
                        task.id, entry.start, entry.finish, entry.demand, task.duration, task.demand
                    ),
                ));
            }
            if entry.finish > horizon {
                violations.push(Violation::new(
                    ViolationType::HorizonExceeded,
                    &task.id,
                    format!(
                        "Task '{}' finishes at {} after horizon {}",
                        task.id, entry.finish, horizon
                    ),
                ));
            }

            for pred in &task.predecessors {
                if let Some(p) = by_id.get(pred.as_str()) {
                    if p.finish > entry.start {
                        violations.push(Violation::precedence_violation(
                            &task.id,
                            format!(
                                "Task '{}' starts at {} before predecessor '{}' finishes at {}",
                                task.id, entry.start, pred, p.finish
                            ),
                        ));
                    }
                }
            }
        }

        for (t, usage) in self.usage_profile().into_iter().enumerate() {
            if usage > project.capacity {
                violations.push(Violation::capacity_exceeded(
                    t as i64,
                    format!(
                        "Usage {} exceeds capacity {} at t={}",
                        usage, project.capacity, t
                    ),
                ));
            }
        }

        violations
    }

    /// Whether the schedule satisfies every constraint of `project`.
    pub fn is_valid_for(&self, project: &Project) -> bool {
        self.verify(project).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    fn sample_project() -> Project {
        Project::new(5)
            .with_task(Task::new("A").with_duration(2).with_demand(3))
            .with_task(Task::new("B").with_duration(3).with_demand(2))
            .with_task(
                Task::new("C")
                    .with_duration(5)
                    .with_demand(4)
                    .with_predecessor("A"),
            )
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_entry(ScheduledTask::new("A", 0, 2, 3));
        s.add_entry(ScheduledTask::new("B", 0, 3, 2));
        s.add_entry(ScheduledTask::new("C", 3, 8, 4));
        s
    }

    #[test]
    fn test_schedule_makespan() {
        assert_eq!(sample_schedule().makespan(), 8);
        assert_eq!(Schedule::new().makespan(), 0);
    }

    #[test]
    fn test_usage_profile() {
        let s = sample_schedule();
        assert_eq!(s.usage_profile(), vec![5, 5, 2, 4, 4, 4, 4, 4]);
        assert_eq!(s.usage_at(2), 2);
        assert_eq!(s.usage_at(8), 0);
        assert_eq!(s.peak_usage(), 5);
    }

    #[test]
    fn test_valid_schedule_has_no_violations() {
        let s = sample_schedule();
        assert!(s.verify(&sample_project()).is_empty());
        assert!(s.is_valid_for(&sample_project()));
    }

    #[test]
    fn test_from_starts() {
        let s = Schedule::from_starts(&sample_project(), &[0, 0, 3]);
        assert_eq!(s, sample_schedule());
        assert_eq!(s.start_of("C"), Some(3));
        assert_eq!(s.finish_of("C"), Some(8));
        assert_eq!(s.start_of("Z"), None);
    }

    #[test]
    fn test_detects_precedence_violation() {
        let s = Schedule::from_starts(&sample_project(), &[0, 5, 1]);
        let violations = s.verify(&sample_project());
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::PrecedenceViolation && v.entity_id == "C"));
    }

    #[test]
    fn test_detects_capacity_violation() {
        // B and C overlap during [2, 3): 2 + 4 > 5
        let s = Schedule::from_starts(&sample_project(), &[0, 0, 2]);
        let violations = s.verify(&sample_project());
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::CapacityExceeded && v.entity_id == "2"));
    }

    #[test]
    fn test_detects_missing_and_unknown_tasks() {
        let mut s = Schedule::new();
        s.add_entry(ScheduledTask::new("A", 0, 2, 3));
        s.add_entry(ScheduledTask::new("A", 2, 4, 3));
        s.add_entry(ScheduledTask::new("X", 0, 1, 0));
        let violations = s.verify(&sample_project());

        let count = |ty: ViolationType| violations.iter().filter(|v| v.violation_type == ty).count();
        assert_eq!(count(ViolationType::MissingTask), 2); // B, C
        assert_eq!(count(ViolationType::UnknownTask), 2); // duplicate A, X
    }

    #[test]
    fn test_detects_horizon_and_duration_problems() {
        let project = sample_project().with_horizon(8);
        let mut s = sample_schedule();
        s.entries[2] = ScheduledTask::new("C", 4, 10, 4);
        let violations = s.verify(&project);
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::HorizonExceeded));
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::DurationMismatch));
    }

    #[test]
    fn test_sorted_entries() {
        let s = sample_schedule();
        let ids: Vec<&str> = s.sorted_entries().iter().map(|e| e.task_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }
}
