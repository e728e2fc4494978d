//! Priority-rule list scheduler.
//!
//! # Algorithm
//!
//! 1. Order tasks by a [`PriorityRule`] into a precedence-feasible list.
//! 2. Place each task at its earliest precedence- and resource-feasible
//!    start (serial schedule generation).
//!
//! Fast and never optimal by construction; the schedule is optimal only
//! when its makespan meets the project lower bound.
//!
//! # Complexity
//! O(n² + n·H) where n = tasks, H = horizon.
//!
//! # Reference
//! Kolisch & Hartmann (1999), "Heuristic Algorithms for the
//! Resource-Constrained Project Scheduling Problem"

use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::models::{Project, Schedule};
use crate::network::ProjectNetwork;
use crate::solver::sgs::{priority_list, serial_sgs, PriorityRule};
use crate::validation::validate_project;

/// Serial list scheduler driven by a priority rule.
///
/// # Example
///
/// ```
/// use u_rcpsp::models::{Project, Task};
/// use u_rcpsp::scheduler::ListScheduler;
/// use u_rcpsp::solver::sgs::PriorityRule;
///
/// let project = Project::new(2).with_tasks([
///     Task::new("A").with_duration(2).with_demand(2),
///     Task::new("B").with_duration(1).with_demand(1).with_predecessor("A"),
/// ]);
/// let schedule = ListScheduler::new(PriorityRule::LatestFinish)
///     .schedule(&project)
///     .unwrap()
///     .unwrap();
/// assert_eq!(schedule.makespan(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ListScheduler {
    rule: PriorityRule,
}

impl ListScheduler {
    /// Creates a scheduler using `rule`.
    pub fn new(rule: PriorityRule) -> Self {
        Self { rule }
    }

    /// The priority rule.
    pub fn rule(&self) -> PriorityRule {
        self.rule
    }

    /// Schedules a project.
    ///
    /// Returns `Ok(None)` if some task cannot finish by the horizon.
    ///
    /// # Errors
    /// `MalformedProject` if the project fails validation.
    pub fn schedule(&self, project: &Project) -> Result<Option<Schedule>> {
        let net = validated_network(project)?;
        let list = priority_list(&net, self.rule);
        let schedule = serial_sgs(&net, &list).map(|starts| Schedule::from_starts(project, &starts));
        debug!(
            rule = self.rule.name(),
            makespan = ?schedule.as_ref().map(Schedule::makespan),
            "list schedule"
        );
        Ok(schedule)
    }

    /// Schedules with every rule and keeps the shortest schedule.
    ///
    /// Ties keep the rule listed first in [`PriorityRule::all`].
    pub fn best_of_rules(project: &Project) -> Result<Option<(PriorityRule, Schedule)>> {
        let mut best: Option<(PriorityRule, Schedule)> = None;
        for rule in PriorityRule::all() {
            if let Some(schedule) = Self::new(rule).schedule(project)? {
                if best.as_ref().map_or(true, |(_, b)| schedule.makespan() < b.makespan()) {
                    best = Some((rule, schedule));
                }
            }
        }
        Ok(best)
    }
}

fn validated_network(project: &Project) -> Result<ProjectNetwork> {
    validate_project(project).map_err(ScheduleError::MalformedProject)?;
    ProjectNetwork::from_project(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{diamond_project, example_project};
    use crate::generator::{generate_project, ProjectGeneratorConfig};
    use crate::models::Task;

    #[test]
    fn test_every_rule_gives_valid_schedule() {
        let project = example_project();
        for rule in PriorityRule::all() {
            let schedule = ListScheduler::new(rule).schedule(&project).unwrap().unwrap();
            assert!(schedule.verify(&project).is_empty(), "{}", rule.name());
            assert!(schedule.makespan() >= 16, "{}", rule.name());
        }
    }

    #[test]
    fn test_task_id_rule() {
        let schedule = ListScheduler::new(PriorityRule::TaskId)
            .schedule(&example_project())
            .unwrap()
            .unwrap();
        assert_eq!(schedule.start_of("C"), Some(3));
        assert_eq!(schedule.start_of("E"), Some(8));
        assert_eq!(schedule.makespan(), 16);
    }

    #[test]
    fn test_tight_horizon_gives_none() {
        let project = diamond_project().with_horizon(6);
        assert!(ListScheduler::default().schedule(&project).unwrap().is_none());
    }

    #[test]
    fn test_malformed_project() {
        let project = Project::new(3).with_task(Task::new("A").with_predecessor("A"));
        let err = ListScheduler::default().schedule(&project).unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedProject(_)));
    }

    #[test]
    fn test_best_of_rules() {
        let project = example_project();
        let (rule, best) = ListScheduler::best_of_rules(&project).unwrap().unwrap();
        for other in PriorityRule::all() {
            let schedule = ListScheduler::new(other).schedule(&project).unwrap().unwrap();
            assert!(best.makespan() <= schedule.makespan(), "{} vs {}", rule.name(), other.name());
        }
    }

    #[test]
    fn test_random_projects_are_valid() {
        let config = ProjectGeneratorConfig::small();
        for seed in 0..20 {
            let project = generate_project(&config, seed);
            let schedule = ListScheduler::default().schedule(&project).unwrap().unwrap();
            assert!(schedule.verify(&project).is_empty(), "seed {seed}");
        }
    }
}
