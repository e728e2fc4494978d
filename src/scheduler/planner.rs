//! End-to-end project scheduling.
//!
//! `ProjectScheduler` validates a project, builds the time-indexed model,
//! hands it to a [`LinearSolver`], and turns the assignment back into a
//! verified [`Schedule`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ListScheduler;
use crate::error::{Result, ScheduleError};
use crate::formulation::ModelBuilder;
use crate::models::{Project, Schedule};
use crate::network::ProjectNetwork;
use crate::solver::{BranchAndBound, LinearSolver, SearchStats, SolveStatus, SolverConfig};
use crate::validation::{validate_project, ValidationError};

/// Outcome of scheduling a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Outcome classification.
    pub status: SolveStatus,
    /// The schedule, when one was found.
    pub schedule: Option<Schedule>,
    /// Makespan of `schedule`.
    pub makespan: Option<i64>,
    /// Project lower bound.
    pub lower_bound: i64,
    /// Solver counters.
    pub stats: SearchStats,
}

impl Solution {
    fn without_schedule(status: SolveStatus, lower_bound: i64, stats: SearchStats) -> Self {
        Self {
            status,
            schedule: None,
            makespan: None,
            lower_bound,
            stats,
        }
    }

    /// Whether the schedule is proven optimal.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Whether a schedule is present.
    pub fn has_schedule(&self) -> bool {
        self.schedule.is_some()
    }

    /// Relative distance between the makespan and the lower bound.
    pub fn gap(&self) -> Option<f64> {
        let makespan = self.makespan?;
        if self.lower_bound > 0 {
            Some((makespan - self.lower_bound) as f64 / self.lower_bound as f64)
        } else {
            Some(0.0)
        }
    }
}

/// Minimum-makespan scheduler over a pluggable solver backend.
///
/// # Example
///
/// ```
/// use u_rcpsp::models::{Project, Task};
/// use u_rcpsp::scheduler::ProjectScheduler;
///
/// let project = Project::new(3).with_tasks([
///     Task::new("A").with_duration(2).with_demand(2),
///     Task::new("B").with_duration(2).with_demand(2),
///     Task::new("C").with_duration(1).with_demand(1).with_predecessors(["A", "B"]),
/// ]);
/// let solution = ProjectScheduler::new().solve(&project).unwrap();
/// assert!(solution.is_optimal());
/// assert_eq!(solution.makespan, Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct ProjectScheduler<S = BranchAndBound> {
    solver: S,
    config: SolverConfig,
}

impl ProjectScheduler<BranchAndBound> {
    /// Creates a scheduler using the built-in branch-and-bound.
    pub fn new() -> Self {
        Self::with_solver(BranchAndBound::new())
    }
}

impl Default for ProjectScheduler<BranchAndBound> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LinearSolver> ProjectScheduler<S> {
    /// Creates a scheduler using `solver`.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            config: SolverConfig::default(),
        }
    }

    /// Sets the solver configuration.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The solver backend.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Schedules a project with minimum makespan.
    ///
    /// A project whose only problem is a task demanding more than the
    /// capacity yields status `Infeasible` without invoking the solver.
    ///
    /// # Errors
    /// - `MalformedProject` for structural input errors.
    /// - `ModelTooLarge` when tasks × (horizon + 1) exceeds
    ///   `max_model_cells`. Checked before any heuristic or model runs.
    /// - `SolverUnavailable` / `UnsupportedModel` from the backend.
    /// - `CorruptSolution` if the returned assignment violates the model
    ///   or the decoded schedule violates the project.
    pub fn solve(&self, project: &Project) -> Result<Solution> {
        info!(
            project = %project.name,
            tasks = project.task_count(),
            capacity = project.capacity,
            solver = self.solver.name(),
            "scheduling project"
        );

        if let Err(errors) = validate_project(project) {
            if errors.iter().all(ValidationError::is_capacity_excess) {
                for e in &errors {
                    info!(reason = %e.message, "no schedule can exist");
                }
                let lower_bound = ProjectNetwork::from_project(project)?.lower_bound();
                return Ok(Solution::without_schedule(
                    SolveStatus::Infeasible,
                    lower_bound,
                    SearchStats::default(),
                ));
            }
            return Err(ScheduleError::MalformedProject(errors));
        }

        let limit = self.config.max_model_cells;
        ModelBuilder::new(project).with_cell_limit(limit).check_size()?;

        let project = self.tightened(project)?;
        let lower_bound = ProjectNetwork::from_project(&project)?.lower_bound();

        let model = ModelBuilder::new(&project).with_cell_limit(limit).build()?;
        let solution = self.solver.solve(&model, &self.config)?;
        let tolerance = self.config.integrality_tolerance;

        let Some(values) = solution.values.as_deref() else {
            info!(status = ?solution.status, "no schedule found");
            return Ok(Solution::without_schedule(solution.status, lower_bound, solution.stats));
        };

        let problems = model.violations(values, tolerance);
        if !problems.is_empty() {
            warn!(count = problems.len(), first = %problems[0], "solver assignment violates model");
            return Err(ScheduleError::corrupt_solution(problems.join("; ")));
        }

        let starts = model.decode_starts(values, tolerance)?;
        let schedule = Schedule::from_starts(&project, &starts);
        let violations = schedule.verify(&project);
        if !violations.is_empty() {
            warn!(count = violations.len(), "decoded schedule violates project");
            let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
            return Err(ScheduleError::corrupt_solution(messages.join("; ")));
        }

        let makespan = schedule.makespan();
        let status = match solution.status {
            SolveStatus::Feasible | SolveStatus::TimedOut if makespan == lower_bound => {
                debug!(makespan, "schedule meets the lower bound");
                SolveStatus::Optimal
            }
            status => status,
        };

        info!(?status, makespan, lower_bound, "project scheduled");
        Ok(Solution {
            status,
            schedule: Some(schedule),
            makespan: Some(makespan),
            lower_bound,
            stats: solution.stats,
        })
    }

    /// Shrinks the horizon to the best list-schedule makespan when enabled.
    fn tightened<'p>(&self, project: &'p Project) -> Result<Cow<'p, Project>> {
        if !self.config.tighten_horizon {
            return Ok(Cow::Borrowed(project));
        }
        match ListScheduler::best_of_rules(project)? {
            Some((rule, schedule))
                if schedule.makespan() > 0 && schedule.makespan() < project.horizon() =>
            {
                debug!(
                    rule = rule.name(),
                    from = project.horizon(),
                    to = schedule.makespan(),
                    "horizon tightened"
                );
                Ok(Cow::Owned(project.clone().with_horizon(schedule.makespan())))
            }
            _ => Ok(Cow::Borrowed(project)),
        }
    }
}
