//! Solver-neutral linear model.
//!
//! A `LinearModel` is a minimization problem over integer and binary
//! variables with integer-coefficient linear constraints. Every variable
//! and constraint carries a role tag so that specialized solvers can
//! recover the project structure from the model alone, and decoded
//! solver output can be checked row by row.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::network::ProjectNetwork;

/// Index of a variable in its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarDomain {
    /// Integer in `[lower, upper]`.
    Integer { lower: i64, upper: i64 },
    /// 0 or 1.
    Binary,
}

/// What a variable stands for in the scheduling formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarRole {
    /// Start time of task `task`.
    Start { task: usize },
    /// Whether task `task` occupies the resource during time unit `time`.
    Active { task: usize, time: i64 },
    /// Project makespan.
    Makespan,
}

/// A decision variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Display name, e.g. `start[A]`.
    pub name: String,
    /// Domain.
    pub domain: VarDomain,
    /// Role in the formulation.
    pub role: VarRole,
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs ≤ rhs`
    LessEq,
    /// `lhs ≥ rhs`
    GreaterEq,
    /// `lhs = rhs`
    Equal,
}

/// Constraint families of the time-indexed formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintFamily {
    /// `start[p] - start[j] ≤ -duration[p]`
    Precedence,
    /// `start[i] + M·active[i][t] ≤ t + M`
    ActivityLowerLink,
    /// `-start[i] + M·active[i][t] ≤ duration[i] - 1 - t + M`
    ActivityUpperLink,
    /// `Σ_t active[i][t] = duration[i]`
    Coverage,
    /// `Σ_i demand[i]·active[i][t] ≤ capacity`
    Resource,
    /// `start[i] - makespan ≤ -duration[i]`
    Makespan,
}

/// A linear constraint `Σ coef·var (sense) rhs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Display name.
    pub name: String,
    /// Family.
    pub family: ConstraintFamily,
    /// Non-zero terms.
    pub terms: Vec<(VarId, i64)>,
    /// Sense.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: i64,
}

impl LinearConstraint {
    /// Left-hand side value under `values`.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c as f64 * values[v.0])
            .sum()
    }

    /// Whether the constraint holds within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        let rhs = self.rhs as f64;
        match self.sense {
            Sense::LessEq => lhs <= rhs + tolerance,
            Sense::GreaterEq => lhs >= rhs - tolerance,
            Sense::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// A minimization model over integer and binary variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Model name.
    pub name: String,
    /// Task IDs, indexed like `VarRole::Start { task }`.
    pub task_ids: Vec<String>,
    /// Planning horizon the model was built for.
    pub horizon: i64,
    /// Big-M constant of the activity links (always equal to `horizon`).
    pub big_m: i64,
    /// Variables, indexed by `VarId`.
    pub variables: Vec<Variable>,
    /// Constraints.
    pub constraints: Vec<LinearConstraint>,
    /// Variable to minimize.
    pub objective: VarId,
}

impl LinearModel {
    /// Creates an empty model. The objective must be set by the builder.
    pub fn new(name: impl Into<String>, task_ids: Vec<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            task_ids,
            horizon,
            big_m: horizon,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: VarId(0),
        }
    }

    /// Adds a variable and returns its ID.
    pub fn add_variable(&mut self, name: impl Into<String>, domain: VarDomain, role: VarRole) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            domain,
            role,
        });
        VarId(self.variables.len() - 1)
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of tasks.
    pub fn task_count(&self) -> usize {
        self.task_ids.len()
    }

    /// Constraints of one family.
    pub fn constraints_of(&self, family: ConstraintFamily) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.family == family)
    }

    /// Finds the variable with a given role.
    pub fn variable_for(&self, role: VarRole) -> Option<VarId> {
        self.variables
            .iter()
            .position(|v| v.role == role)
            .map(VarId)
    }

    /// Checks an assignment against domains, integrality and every constraint.
    ///
    /// Returns a description of each violated row or domain.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        if values.len() != self.variables.len() {
            return vec![format!(
                "expected {} values, got {}",
                self.variables.len(),
                values.len()
            )];
        }

        let mut problems = Vec::new();
        for (var, &value) in self.variables.iter().zip(values) {
            if (value - value.round()).abs() > tolerance {
                problems.push(format!("{} = {value} is not integral", var.name));
            }
            let (lower, upper) = match var.domain {
                VarDomain::Integer { lower, upper } => (lower as f64, upper as f64),
                VarDomain::Binary => (0.0, 1.0),
            };
            if value < lower - tolerance || value > upper + tolerance {
                problems.push(format!("{} = {value} outside [{lower}, {upper}]", var.name));
            }
        }

        for c in &self.constraints {
            if !c.is_satisfied(values, tolerance) {
                problems.push(format!(
                    "{} violated: lhs {} vs rhs {}",
                    c.name,
                    c.lhs(values),
                    c.rhs
                ));
            }
        }

        problems
    }

    /// Whether an assignment is feasible within `tolerance`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        self.violations(values, tolerance).is_empty()
    }

    /// Full assignment implied by task start times.
    ///
    /// `active[i][t]` is 1 exactly for `start[i] ≤ t < start[i] + duration[i]`
    /// and the makespan is the latest finish.
    pub fn values_from_starts(&self, starts: &[i64], durations: &[i64]) -> Vec<f64> {
        let makespan = starts
            .iter()
            .zip(durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(0);

        self.variables
            .iter()
            .map(|v| match v.role {
                VarRole::Start { task } => starts[task] as f64,
                VarRole::Active { task, time } => {
                    let running = starts[task] <= time && time < starts[task] + durations[task];
                    if running {
                        1.0
                    } else {
                        0.0
                    }
                }
                VarRole::Makespan => makespan as f64,
            })
            .collect()
    }

    /// Extracts integral start times from solver output.
    ///
    /// # Errors
    /// `CorruptSolution` if a start value is missing or not within
    /// `tolerance` of an integer.
    pub fn decode_starts(&self, values: &[f64], tolerance: f64) -> Result<Vec<i64>> {
        if values.len() != self.variables.len() {
            return Err(ScheduleError::corrupt_solution(format!(
                "expected {} values, got {}",
                self.variables.len(),
                values.len()
            )));
        }

        let mut starts: Vec<Option<i64>> = vec![None; self.task_count()];
        for (var, &value) in self.variables.iter().zip(values) {
            if let VarRole::Start { task } = var.role {
                let rounded = value.round();
                if (value - rounded).abs() > tolerance {
                    return Err(ScheduleError::corrupt_solution(format!(
                        "{} = {value} is not integral",
                        var.name
                    )));
                }
                starts[task] = Some(rounded as i64);
            }
        }

        starts
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.ok_or_else(|| {
                    ScheduleError::corrupt_solution(format!(
                        "no start value for task '{}'",
                        self.task_ids[i]
                    ))
                })
            })
            .collect()
    }

    /// Rebuilds the project network encoded by a time-indexed model.
    ///
    /// Durations come from the makespan rows, precedence from the
    /// precedence rows, demands and capacity from the resource rows.
    ///
    /// # Errors
    /// `UnsupportedModel` if the model lacks the rows of the time-indexed
    /// formulation.
    pub fn recover_network(&self) -> Result<ProjectNetwork> {
        let n = self.task_count();
        let task_of = |v: VarId| match self.variables.get(v.0).map(|var| var.role) {
            Some(VarRole::Start { task }) => Some(task),
            _ => None,
        };

        let mut durations: Vec<Option<i64>> = vec![None; n];
        for c in self.constraints_of(ConstraintFamily::Makespan) {
            let task = c
                .terms
                .iter()
                .find_map(|&(v, coef)| (coef == 1).then(|| task_of(v)).flatten())
                .ok_or_else(|| {
                    ScheduleError::unsupported_model(format!("makespan row {} has no start term", c.name))
                })?;
            durations[task] = Some(-c.rhs);
        }
        let durations = durations
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                d.ok_or_else(|| {
                    ScheduleError::unsupported_model(format!(
                        "no makespan row for task '{}'",
                        self.task_ids[i]
                    ))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        let mut predecessors = vec![Vec::new(); n];
        for c in self.constraints_of(ConstraintFamily::Precedence) {
            let before = c.terms.iter().find_map(|&(v, coef)| (coef == 1).then(|| task_of(v)).flatten());
            let after = c.terms.iter().find_map(|&(v, coef)| (coef == -1).then(|| task_of(v)).flatten());
            match (before, after) {
                (Some(p), Some(j)) => predecessors[j].push(p),
                _ => {
                    return Err(ScheduleError::unsupported_model(format!(
                        "precedence row {} is not start[p] - start[j]",
                        c.name
                    )))
                }
            }
        }

        let mut demands = vec![0i64; n];
        let mut capacity: Option<i64> = None;
        for c in self.constraints_of(ConstraintFamily::Resource) {
            capacity = Some(capacity.map_or(c.rhs, |cap| cap.min(c.rhs)));
            for &(v, coef) in &c.terms {
                if let Some(VarRole::Active { task, .. }) = self.variables.get(v.0).map(|var| var.role) {
                    demands[task] = demands[task].max(coef);
                }
            }
        }
        // A model without resource rows has no demand anywhere.
        let capacity = capacity.unwrap_or(i64::MAX);

        ProjectNetwork::from_parts(
            self.task_ids.clone(),
            durations,
            demands,
            predecessors,
            capacity,
            self.horizon,
        )
        .map_err(|e| ScheduleError::unsupported_model(e.to_string()))
    }

    /// Writes the model in CPLEX LP format.
    ///
    /// The model name becomes the leading comment, with control characters
    /// replaced by spaces.
    ///
    /// Variables are written as `x<id>` and every variable appears in the
    /// objective (with coefficient 0 where it does not belong) so that
    /// readers that number columns by first appearance keep `VarId` order.
    pub fn to_cplex_lp(&self) -> String {
        let mut out = String::new();
        // The name is a comment line; a control character would end it early.
        let title: String = self
            .name
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let _ = writeln!(out, "\\ {title}");
        let _ = writeln!(out, "Minimize");
        out.push_str(" obj:");
        for (i, _) in self.variables.iter().enumerate() {
            let coef = if VarId(i) == self.objective { 1 } else { 0 };
            let _ = write!(out, " + {coef} x{i}");
        }
        out.push('\n');

        let _ = writeln!(out, "Subject To");
        for (k, c) in self.constraints.iter().enumerate() {
            let _ = write!(out, " c{k}:");
            for &(v, coef) in &c.terms {
                if coef < 0 {
                    let _ = write!(out, " - {} x{}", -coef, v.0);
                } else {
                    let _ = write!(out, " + {coef} x{}", v.0);
                }
            }
            let op = match c.sense {
                Sense::LessEq => "<=",
                Sense::GreaterEq => ">=",
                Sense::Equal => "=",
            };
            let _ = writeln!(out, " {op} {}", c.rhs);
        }

        let _ = writeln!(out, "Bounds");
        for (i, v) in self.variables.iter().enumerate() {
            if let VarDomain::Integer { lower, upper } = v.domain {
                let _ = writeln!(out, " {lower} <= x{i} <= {upper}");
            }
        }

        let generals: Vec<String> = self
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| matches!(v.domain, VarDomain::Integer { .. }))
            .map(|(i, _)| format!("x{i}"))
            .collect();
        if !generals.is_empty() {
            let _ = writeln!(out, "General");
            let _ = writeln!(out, " {}", generals.join(" "));
        }

        let binaries: Vec<String> = self
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.domain == VarDomain::Binary)
            .map(|(i, _)| format!("x{i}"))
            .collect();
        if !binaries.is_empty() {
            let _ = writeln!(out, "Binary");
            let _ = writeln!(out, " {}", binaries.join(" "));
        }

        let _ = writeln!(out, "End");
        out
    }

    /// Constraint counts per family.
    pub fn family_counts(&self) -> HashMap<ConstraintFamily, usize> {
        let mut counts = HashMap::new();
        for c in &self.constraints {
            *counts.entry(c.family).or_insert(0) += 1;
        }
        counts
    }
}
