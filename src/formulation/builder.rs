//! Time-indexed MILP formulation of the RCPSP.
//!
//! Translates a validated `Project` into a `LinearModel`:
//! - A `start[i]` integer variable per task
//! - An `active[i][t]` binary per task and time unit `t ∈ [0, H]`
//! - A `makespan` integer variable (the objective)
//! - Precedence, big-M activity link, coverage, resource and makespan rows
//!
//! The big-M constant is the horizon `H`: the smallest value that leaves
//! both link rows slack whenever `active[i][t] = 0`.
//!
//! The model grows with `n·(H + 1)` task-time cells (one binary and two
//! link rows each). Builds above the cell limit fail with
//! `ModelTooLarge` before anything is allocated.
//!
//! # Reference
//! - Pritsker, Watters & Wolfe (1969), "Multiproject Scheduling with
//!   Limited Resources: A Zero-One Programming Approach"
//! - Artigues, Demassey & Néron (2008), "Resource-Constrained Project
//!   Scheduling", Ch. 3

use tracing::debug;

use super::linear::{
    ConstraintFamily, LinearConstraint, LinearModel, Sense, VarDomain, VarId, VarRole,
};
use crate::error::{Result, ScheduleError};
use crate::models::Project;
use crate::validation::validate_project;

/// Builds a `LinearModel` from a project.
///
/// # Example
/// ```
/// use u_rcpsp::formulation::ModelBuilder;
/// use u_rcpsp::models::{Project, Task};
///
/// let project = Project::new(2)
///     .with_task(Task::new("A").with_duration(2).with_demand(1))
///     .with_task(Task::new("B").with_duration(1).with_demand(2).with_predecessor("A"));
/// let model = ModelBuilder::new(&project).build().unwrap();
///
/// // 2 starts + 2 × (H + 1) activity flags + makespan, with H = 3
/// assert_eq!(model.variable_count(), 2 + 2 * 4 + 1);
/// assert_eq!(model.big_m, 3);
/// ```
pub struct ModelBuilder<'a> {
    project: &'a Project,
    cell_limit: u64,
}

/// Default limit on `n·(H + 1)` task-time cells.
pub const DEFAULT_CELL_LIMIT: u64 = 1_000_000;

/// Variable handles created while building.
struct Handles {
    starts: Vec<VarId>,
    active: Vec<Vec<VarId>>,
    makespan: VarId,
}

impl<'a> ModelBuilder<'a> {
    /// Creates a builder for a project.
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            cell_limit: DEFAULT_CELL_LIMIT,
        }
    }

    /// Sets the largest accepted number of task-time cells.
    pub fn with_cell_limit(mut self, limit: u64) -> Self {
        self.cell_limit = limit;
        self
    }

    /// Number of `active[i][t]` cells the model would have: `n·(H + 1)`.
    pub fn cell_count(&self) -> u128 {
        let slots = self.project.horizon().max(0) as u128 + 1;
        self.project.tasks.len() as u128 * slots
    }

    /// Fails if the model would exceed the cell limit.
    ///
    /// # Errors
    /// `ModelTooLarge` with the cell count and the limit.
    pub fn check_size(&self) -> Result<()> {
        let cells = self.cell_count();
        if cells > u128::from(self.cell_limit) {
            return Err(ScheduleError::ModelTooLarge {
                cells,
                limit: self.cell_limit,
            });
        }
        Ok(())
    }

    /// Builds the model.
    ///
    /// # Errors
    /// - `MalformedProject` if the project fails validation, including tasks
    ///   whose demand exceeds capacity.
    /// - `ModelTooLarge` above the cell limit.
    pub fn build(&self) -> Result<LinearModel> {
        validate_project(self.project).map_err(ScheduleError::MalformedProject)?;
        self.check_size()?;

        let project = self.project;
        let horizon = project.horizon();
        let index = |id: &str| project.tasks.iter().position(|t| t.id == id);

        let name = if project.name.is_empty() {
            "rcpsp".to_string()
        } else {
            project.name.clone()
        };
        let mut model = LinearModel::new(
            name,
            project.tasks.iter().map(|t| t.id.clone()).collect(),
            horizon,
        );
        let handles = self.add_variables(&mut model);
        model.objective = handles.makespan;

        for (j, task) in project.tasks.iter().enumerate() {
            for pred in &task.predecessors {
                // Validation guarantees the predecessor exists.
                if let Some(p) = index(pred) {
                    model.add_constraint(self.precedence_row(&handles, p, j));
                }
            }
        }

        for i in 0..project.tasks.len() {
            for t in 0..=horizon {
                let [lower, upper] = self.activity_link_rows(&handles, model.big_m, i, t);
                model.add_constraint(lower);
                model.add_constraint(upper);
            }
            model.add_constraint(self.coverage_row(&handles, i));
        }

        for t in 0..=horizon {
            if let Some(row) = self.resource_row(&handles, t) {
                model.add_constraint(row);
            }
        }

        for i in 0..project.tasks.len() {
            model.add_constraint(self.makespan_row(&handles, i));
        }

        debug!(
            model = %model.name,
            variables = model.variable_count(),
            constraints = model.constraint_count(),
            horizon,
            "built time-indexed model"
        );

        Ok(model)
    }

    fn add_variables(&self, model: &mut LinearModel) -> Handles {
        let horizon = model.horizon;
        let mut starts = Vec::with_capacity(self.project.tasks.len());
        let mut active = Vec::with_capacity(self.project.tasks.len());

        for (i, task) in self.project.tasks.iter().enumerate() {
            starts.push(model.add_variable(
                format!("start[{}]", task.id),
                VarDomain::Integer {
                    lower: 0,
                    upper: horizon,
                },
                VarRole::Start { task: i },
            ));
        }

        for (i, task) in self.project.tasks.iter().enumerate() {
            let row = (0..=horizon)
                .map(|t| {
                    model.add_variable(
                        format!("active[{}][{t}]", task.id),
                        VarDomain::Binary,
                        VarRole::Active { task: i, time: t },
                    )
                })
                .collect();
            active.push(row);
        }

        let makespan = model.add_variable(
            "makespan",
            VarDomain::Integer {
                lower: 0,
                upper: horizon,
            },
            VarRole::Makespan,
        );

        Handles {
            starts,
            active,
            makespan,
        }
    }

    /// `start[p] + duration[p] ≤ start[j]`
    fn precedence_row(&self, h: &Handles, p: usize, j: usize) -> LinearConstraint {
        let tasks = &self.project.tasks;
        LinearConstraint {
            name: format!("precedence[{}->{}]", tasks[p].id, tasks[j].id),
            family: ConstraintFamily::Precedence,
            terms: vec![(h.starts[p], 1), (h.starts[j], -1)],
            sense: Sense::LessEq,
            rhs: -tasks[p].duration,
        }
    }

    /// `start[i] ≤ t + M(1 - active[i][t])` and
    /// `t ≤ start[i] + duration[i] - 1 + M(1 - active[i][t])`.
    fn activity_link_rows(&self, h: &Handles, big_m: i64, i: usize, t: i64) -> [LinearConstraint; 2] {
        let task = &self.project.tasks[i];
        let active = h.active[i][t as usize];
        [
            LinearConstraint {
                name: format!("link_lower[{}][{t}]", task.id),
                family: ConstraintFamily::ActivityLowerLink,
                terms: vec![(h.starts[i], 1), (active, big_m)],
                sense: Sense::LessEq,
                rhs: t + big_m,
            },
            LinearConstraint {
                name: format!("link_upper[{}][{t}]", task.id),
                family: ConstraintFamily::ActivityUpperLink,
                terms: vec![(h.starts[i], -1), (active, big_m)],
                sense: Sense::LessEq,
                rhs: task.duration - 1 - t + big_m,
            },
        ]
    }

    /// `Σ_t active[i][t] = duration[i]`
    ///
    /// The link rows only allow `active` inside the task's interval; this
    /// row forces every unit of that interval to be active.
    fn coverage_row(&self, h: &Handles, i: usize) -> LinearConstraint {
        let task = &self.project.tasks[i];
        LinearConstraint {
            name: format!("coverage[{}]", task.id),
            family: ConstraintFamily::Coverage,
            terms: h.active[i].iter().map(|&v| (v, 1)).collect(),
            sense: Sense::Equal,
            rhs: task.duration,
        }
    }

    /// `Σ_i demand[i]·active[i][t] ≤ capacity`, or `None` if no task
    /// with positive demand exists.
    fn resource_row(&self, h: &Handles, t: i64) -> Option<LinearConstraint> {
        let terms: Vec<(VarId, i64)> = self
            .project
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.demand > 0)
            .map(|(i, task)| (h.active[i][t as usize], task.demand))
            .collect();

        if terms.is_empty() {
            return None;
        }

        Some(LinearConstraint {
            name: format!("resource[{t}]"),
            family: ConstraintFamily::Resource,
            terms,
            sense: Sense::LessEq,
            rhs: self.project.capacity,
        })
    }

    /// `start[i] + duration[i] ≤ makespan`
    fn makespan_row(&self, h: &Handles, i: usize) -> LinearConstraint {
        let task = &self.project.tasks[i];
        LinearConstraint {
            name: format!("makespan[{}]", task.id),
            family: ConstraintFamily::Makespan,
            terms: vec![(h.starts[i], 1), (h.makespan, -1)],
            sense: Sense::LessEq,
            rhs: -task.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{diamond_project, example_project};
    use crate::models::Task;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_variable_layout() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let h = project.horizon(); // 22

        assert_eq!(model.horizon, h);
        assert_eq!(model.big_m, h);
        assert_eq!(model.variable_count(), 7 + 7 * (h as usize + 1) + 1);
        assert_eq!(model.variables[model.objective.0].role, VarRole::Makespan);
        assert_eq!(model.variable_for(VarRole::Start { task: 2 }), Some(VarId(2)));
    }

    #[test]
    fn test_constraint_counts() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let counts = model.family_counts();
        let slots = project.horizon() as usize + 1;

        // A→C, A→D, B→D, D→E, B→F, C→F, E→G, F→G
        assert_eq!(counts[&ConstraintFamily::Precedence], 8);
        assert_eq!(counts[&ConstraintFamily::ActivityLowerLink], 7 * slots);
        assert_eq!(counts[&ConstraintFamily::ActivityUpperLink], 7 * slots);
        assert_eq!(counts[&ConstraintFamily::Coverage], 7);
        assert_eq!(counts[&ConstraintFamily::Resource], slots);
        assert_eq!(counts[&ConstraintFamily::Makespan], 7);
    }

    #[test]
    fn test_big_m_tracks_horizon_override() {
        let project = example_project().with_horizon(18);
        let model = ModelBuilder::new(&project).build().unwrap();
        assert_eq!(model.big_m, 18);
        let row = model
            .constraints_of(ConstraintFamily::ActivityLowerLink)
            .next()
            .unwrap();
        assert_eq!(row.terms[1].1, 18);
        assert_eq!(row.rhs, 18); // t = 0
    }

    #[test]
    fn test_known_schedule_is_feasible() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let durations: Vec<i64> = project.tasks.iter().map(|t| t.duration).collect();

        let values = model.values_from_starts(&[0, 0, 3, 3, 8, 11, 13], &durations);
        assert!(model.is_feasible(&values, 1e-6), "{:?}", model.violations(&values, 1e-6));
        assert_eq!(values[model.objective.0], 16.0);
    }

    #[test]
    fn test_overlapping_schedule_is_infeasible() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let durations: Vec<i64> = project.tasks.iter().map(|t| t.duration).collect();

        // E (demand 5) overlaps C (demand 4) at t = 7
        let values = model.values_from_starts(&[0, 0, 3, 3, 7, 11, 13], &durations);
        let problems = model.violations(&values, 1e-6);
        assert!(problems.iter().any(|p| p.starts_with("resource[7]")));
    }

    #[test]
    fn test_inactive_running_task_is_rejected() {
        // Clearing an active flag inside the interval must break coverage.
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let durations: Vec<i64> = project.tasks.iter().map(|t| t.duration).collect();
        let mut values = model.values_from_starts(&[0, 1, 4, 6], &durations);
        assert!(model.is_feasible(&values, 1e-6));

        let flag = model
            .variable_for(VarRole::Active { task: 1, time: 2 })
            .unwrap();
        values[flag.0] = 0.0;
        let problems = model.violations(&values, 1e-6);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("coverage[L]"));
    }

    #[test]
    fn test_zero_demand_tasks_have_no_resource_rows() {
        let project = Project::new(1)
            .with_task(Task::new("A").with_duration(2))
            .with_task(Task::new("B").with_duration(1));
        let model = ModelBuilder::new(&project).build().unwrap();
        assert_eq!(model.constraints_of(ConstraintFamily::Resource).count(), 0);
    }

    #[test]
    fn test_rejects_cycle() {
        let project = Project::new(5)
            .with_task(Task::new("A").with_predecessor("B"))
            .with_task(Task::new("B").with_predecessor("A"));
        let err = ModelBuilder::new(&project).build().unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedProject(_)));
    }

    #[test]
    fn test_rejects_demand_over_capacity() {
        let project = example_project().with_task(Task::new("H").with_demand(9));
        let err = ModelBuilder::new(&project).build().unwrap_err();
        assert_eq!(
            err.validation_errors()[0].kind,
            ValidationErrorKind::DemandExceedsCapacity
        );
    }

    #[test]
    fn test_cell_limit() {
        let project = example_project(); // 7 × 23 cells
        let builder = ModelBuilder::new(&project);
        assert_eq!(builder.cell_count(), 161);
        assert!(builder.check_size().is_ok());

        let err = ModelBuilder::new(&project)
            .with_cell_limit(160)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::ModelTooLarge {
                cells: 161,
                limit: 160
            }
        ));
        assert!(ModelBuilder::new(&project).with_cell_limit(161).build().is_ok());
    }

    #[test]
    fn test_long_task_is_rejected_before_allocation() {
        let project = Project::new(1).with_task(Task::new("A").with_duration(20_000_000).with_demand(1));
        let err = ModelBuilder::new(&project).build().unwrap_err();
        assert!(matches!(err, ScheduleError::ModelTooLarge { .. }));

        let project = Project::new(1)
            .with_task(Task::new("A").with_duration(1).with_demand(1))
            .with_horizon(i64::MAX);
        let builder = ModelBuilder::new(&project);
        assert_eq!(builder.cell_count(), 1u128 << 63);
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_recover_network_round_trip() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let net = model.recover_network().unwrap();

        assert_eq!(net.len(), 7);
        assert_eq!(net.capacity(), 5);
        assert_eq!(net.horizon(), 22);
        for (i, task) in project.tasks.iter().enumerate() {
            assert_eq!(net.id(i), task.id);
            assert_eq!(net.duration(i), task.duration);
            assert_eq!(net.demand(i), task.demand);
            let mut preds: Vec<&str> = net.predecessors(i).iter().map(|&p| net.id(p)).collect();
            preds.sort_unstable();
            let mut expected: Vec<&str> = task.predecessors.iter().map(String::as_str).collect();
            expected.sort_unstable();
            assert_eq!(preds, expected);
        }
    }

    #[test]
    fn test_decode_starts() {
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let durations: Vec<i64> = project.tasks.iter().map(|t| t.duration).collect();
        let mut values = model.values_from_starts(&[0, 1, 4, 6], &durations);
        values[1] += 1e-9;
        assert_eq!(model.decode_starts(&values, 1e-6).unwrap(), vec![0, 1, 4, 6]);

        values[1] = 1.4;
        assert!(matches!(
            model.decode_starts(&values, 1e-6),
            Err(ScheduleError::CorruptSolution(_))
        ));
    }

    #[test]
    fn test_cplex_lp_output() {
        let project = Project::new(2)
            .with_task(Task::new("A").with_duration(1).with_demand(1))
            .with_task(Task::new("B").with_duration(1).with_demand(2).with_predecessor("A"));
        let model = ModelBuilder::new(&project).build().unwrap();
        let lp = model.to_cplex_lp();

        assert!(lp.starts_with("\\ rcpsp\nMinimize\n obj: + 0 x0"));
        // makespan is the last variable
        let last = model.variable_count() - 1;
        assert!(lp.contains(&format!("+ 1 x{last}\n")));
        assert!(lp.contains(" c0: + 1 x0 - 1 x1 <= -1\n"));
        assert!(lp.contains("General\n x0 x1 x"));
        assert!(lp.contains("Binary\n x2 "));
        assert!(lp.trim_end().ends_with("End"));
    }

    #[test]
    fn test_cplex_lp_name_stays_on_one_line() {
        let project = diamond_project().with_name("plant\nMaximize\r\tx");
        let model = ModelBuilder::new(&project).build().unwrap();
        let lp = model.to_cplex_lp();

        let mut lines = lp.lines();
        assert_eq!(lines.next(), Some("\\ plant Maximize  x"));
        assert_eq!(lines.next(), Some("Minimize"));
        assert!(!lp.contains("\nMaximize"));
    }
}
