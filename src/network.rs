//! Indexed project network and critical-path analysis.
//!
//! Solvers work on dense task indices instead of string IDs. A
//! `ProjectNetwork` holds durations, demands and precedence lists per
//! index, a deterministic topological order, and the resource-free
//! longest-path quantities used as lower bounds.
//!
//! # Definitions
//!
//! - **head(j)**: longest path from project start to the start of `j`
//!   (earliest start ignoring the resource).
//! - **tail(j)**: longest path from the start of `j` to project end,
//!   including `duration(j)`.
//! - `head(j) + tail(j)` is a lower bound on the makespan of any schedule.
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Result, ScheduleError};
use crate::models::Project;
use crate::validation::{ValidationError, ValidationErrorKind};

/// A project network over dense task indices.
#[derive(Debug, Clone)]
pub struct ProjectNetwork {
    ids: Vec<String>,
    durations: Vec<i64>,
    demands: Vec<i64>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    capacity: i64,
    horizon: i64,
    order: Vec<usize>,
    heads: Vec<i64>,
    tails: Vec<i64>,
}

impl ProjectNetwork {
    /// Builds the network of a project. Task `i` is `project.tasks[i]`.
    ///
    /// # Errors
    /// `MalformedProject` on unknown predecessors or cycles.
    pub fn from_project(project: &Project) -> Result<Self> {
        let index: HashMap<&str, usize> = project
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        let mut predecessors = Vec::with_capacity(project.tasks.len());
        for task in &project.tasks {
            let mut preds = Vec::with_capacity(task.predecessors.len());
            for pred in &task.predecessors {
                let Some(&p) = index.get(pred.as_str()) else {
                    return Err(ScheduleError::MalformedProject(vec![ValidationError::new(
                        ValidationErrorKind::InvalidPredecessor,
                        format!("Task '{}' references unknown predecessor '{}'", task.id, pred),
                    )]));
                };
                preds.push(p);
            }
            predecessors.push(preds);
        }

        Self::from_parts(
            project.tasks.iter().map(|t| t.id.clone()).collect(),
            project.tasks.iter().map(|t| t.duration).collect(),
            project.tasks.iter().map(|t| t.demand).collect(),
            predecessors,
            project.capacity,
            project.horizon(),
        )
    }

    /// Builds a network from per-index data.
    ///
    /// # Errors
    /// `MalformedProject` if the vectors disagree in length, a predecessor
    /// index is out of range, or the precedence graph has a cycle.
    pub fn from_parts(
        ids: Vec<String>,
        durations: Vec<i64>,
        demands: Vec<i64>,
        mut predecessors: Vec<Vec<usize>>,
        capacity: i64,
        horizon: i64,
    ) -> Result<Self> {
        let n = ids.len();
        if durations.len() != n || demands.len() != n || predecessors.len() != n {
            return Err(malformed(
                ValidationErrorKind::InvalidPredecessor,
                "Task data vectors have different lengths".to_string(),
            ));
        }

        let mut successors = vec![Vec::new(); n];
        for (j, preds) in predecessors.iter_mut().enumerate() {
            preds.sort_unstable();
            preds.dedup();
            for &p in preds.iter() {
                if p >= n {
                    return Err(malformed(
                        ValidationErrorKind::InvalidPredecessor,
                        format!("Task '{}' references predecessor index {p}", ids[j]),
                    ));
                }
                successors[p].push(j);
            }
        }

        let order = topological_order(&ids, &predecessors, &successors)?;

        let mut heads = vec![0i64; n];
        for &j in &order {
            heads[j] = predecessors[j]
                .iter()
                .map(|&p| heads[p].saturating_add(durations[p]))
                .max()
                .unwrap_or(0);
        }

        let mut tails = vec![0i64; n];
        for &i in order.iter().rev() {
            tails[i] = durations[i]
                .saturating_add(successors[i].iter().map(|&s| tails[s]).max().unwrap_or(0));
        }

        Ok(Self {
            ids,
            durations,
            demands,
            predecessors,
            successors,
            capacity,
            horizon,
            order,
            heads,
            tails,
        })
    }

    /// Returns a copy with a different horizon.
    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the network has no tasks.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Task ID at index `i`.
    pub fn id(&self, i: usize) -> &str {
        &self.ids[i]
    }

    /// All task IDs in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Duration of task `i`.
    #[inline]
    pub fn duration(&self, i: usize) -> i64 {
        self.durations[i]
    }

    /// Durations in index order.
    pub fn durations(&self) -> &[i64] {
        &self.durations
    }

    /// Resource demand of task `i`.
    #[inline]
    pub fn demand(&self, i: usize) -> i64 {
        self.demands[i]
    }

    /// Predecessor indices of task `i` (sorted, deduplicated).
    pub fn predecessors(&self, i: usize) -> &[usize] {
        &self.predecessors[i]
    }

    /// Successor indices of task `i`.
    pub fn successors(&self, i: usize) -> &[usize] {
        &self.successors[i]
    }

    /// Resource capacity.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Planning horizon (upper bound on the makespan).
    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// Topological order; ties between ready tasks break by task ID.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Earliest start of task `i` ignoring the resource.
    #[inline]
    pub fn head(&self, i: usize) -> i64 {
        self.heads[i]
    }

    /// Longest path from the start of task `i` to project end.
    #[inline]
    pub fn tail(&self, i: usize) -> i64 {
        self.tails[i]
    }

    /// Sum of duration × demand, saturating at `i64::MAX`.
    pub fn total_energy(&self) -> i64 {
        self.durations
            .iter()
            .zip(&self.demands)
            .fold(0i64, |acc, (d, r)| acc.saturating_add(d.saturating_mul(*r)))
    }

    /// Length of the longest precedence chain.
    pub fn critical_path_length(&self) -> i64 {
        (0..self.len())
            .map(|i| self.heads[i].saturating_add(self.tails[i]))
            .max()
            .unwrap_or(0)
    }

    /// Makespan bound from resource energy: ⌈energy / capacity⌉.
    pub fn energy_bound(&self) -> i64 {
        if self.capacity <= 0 {
            return 0;
        }
        div_ceil(self.total_energy(), self.capacity)
    }

    /// Admissible makespan lower bound: max(critical path, energy bound).
    pub fn lower_bound(&self) -> i64 {
        self.critical_path_length().max(self.energy_bound())
    }

    /// Indices of tasks on a longest precedence chain, in topological order.
    pub fn critical_tasks(&self) -> Vec<usize> {
        let cp = self.critical_path_length();
        self.order
            .iter()
            .copied()
            .filter(|&i| self.heads[i] + self.tails[i] == cp)
            .collect()
    }

    /// Latest start of every task for a target makespan, ignoring the resource.
    pub fn latest_starts(&self, makespan: i64) -> Vec<i64> {
        self.tails.iter().map(|t| makespan - t).collect()
    }

    /// Makespan of a start vector.
    pub fn makespan_of(&self, starts: &[i64]) -> i64 {
        starts
            .iter()
            .zip(&self.durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(0)
    }

    /// Checks a full start vector against precedence, capacity and horizon.
    ///
    /// Returns the first problem found.
    pub fn check_starts(&self, starts: &[i64]) -> std::result::Result<(), String> {
        if starts.len() != self.len() {
            return Err(format!(
                "expected {} start times, got {}",
                self.len(),
                starts.len()
            ));
        }

        for j in 0..self.len() {
            if starts[j] < 0 {
                return Err(format!("task '{}' starts at {}", self.ids[j], starts[j]));
            }
            if starts[j] + self.durations[j] > self.horizon {
                return Err(format!(
                    "task '{}' finishes at {} after horizon {}",
                    self.ids[j],
                    starts[j] + self.durations[j],
                    self.horizon
                ));
            }
            for &p in &self.predecessors[j] {
                if starts[p] + self.durations[p] > starts[j] {
                    return Err(format!(
                        "task '{}' starts at {} before '{}' finishes at {}",
                        self.ids[j],
                        starts[j],
                        self.ids[p],
                        starts[p] + self.durations[p]
                    ));
                }
            }
        }

        let mut usage = vec![0i64; self.makespan_of(starts).max(0) as usize];
        for j in 0..self.len() {
            for t in starts[j]..starts[j] + self.durations[j] {
                usage[t as usize] += self.demands[j];
            }
        }
        if let Some((t, u)) = usage
            .iter()
            .enumerate()
            .find(|&(_, &u)| u > self.capacity)
        {
            return Err(format!(
                "usage {u} exceeds capacity {} at t={t}",
                self.capacity
            ));
        }

        Ok(())
    }
}

/// Kahn's algorithm with a min-heap keyed by task ID.
fn topological_order(
    ids: &[String],
    predecessors: &[Vec<usize>],
    successors: &[Vec<usize>],
) -> Result<Vec<usize>> {
    let n = ids.len();
    let mut remaining: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<(&str, usize)>> = (0..n)
        .filter(|&i| remaining[i] == 0)
        .map(|i| Reverse((ids[i].as_str(), i)))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &s in &successors[i] {
            remaining[s] -= 1;
            if remaining[s] == 0 {
                ready.push(Reverse((ids[s].as_str(), s)));
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n)
            .filter(|&i| remaining[i] > 0)
            .map(|i| ids[i].as_str())
            .min()
            .unwrap_or_default();
        return Err(malformed(
            ValidationErrorKind::CyclicDependency,
            format!("Circular dependency detected involving task '{stuck}'"),
        ));
    }

    Ok(order)
}

fn malformed(kind: ValidationErrorKind, message: String) -> ScheduleError {
    ScheduleError::MalformedProject(vec![ValidationError::new(kind, message)])
}

/// Ceiling division for non-negative numerators and positive divisors.
#[inline]
pub(crate) fn div_ceil(num: i64, den: i64) -> i64 {
    num / den + i64::from(num % den != 0)
}
