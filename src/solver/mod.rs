//! Solver engines for the time-indexed project scheduling model.
//!
//! Every backend implements [`LinearSolver`]: given a [`LinearModel`] it
//! returns an assignment for all model variables together with a
//! [`SolveStatus`]. The model builder never needs to know which backend
//! runs.
//!
//! # Backends
//!
//! | Backend | Strategy | Proves optimality |
//! |---------|----------|-------------------|
//! | [`BranchAndBound`] | Depth-first over active schedules with critical-path and energy bounds | Yes |
//! | [`ExhaustiveSolver`] | Every topological order through the serial SGS | Yes (small instances) |
//! | [`GlpkSolver`] | External `glpsol` process on the MILP | Yes, unless the time limit hits |
//!
//! # References
//! - Demeulemeester & Herroelen (1992), "A Branch-and-Bound Procedure for
//!   the Multiple Resource-Constrained Project Scheduling Problem"
//! - Kolisch (1996), "Serial and Parallel Resource-Constrained Project
//!   Scheduling Methods Revisited"

mod bnb;
mod exhaustive;
mod glpk;
mod incumbent;
mod profile;
pub mod sgs;

pub use bnb::{BranchAndBound, NodeState, SearchOutcome};
pub use exhaustive::{exhaustive_search, ExhaustiveSolver};
pub use glpk::{parse_raw_solution, GlpkSolver};
pub use profile::ResourceProfile;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formulation::{LinearModel, DEFAULT_CELL_LIMIT};

/// Outcome classification of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// A schedule was found and proven to have minimal makespan.
    Optimal,
    /// A schedule was found but not proven optimal.
    Feasible,
    /// No schedule satisfies all constraints within the horizon.
    Infeasible,
    /// The search budget ran out. Carries the best schedule found, if any.
    TimedOut,
}

impl SolveStatus {
    /// Whether optimality (or infeasibility) was proven.
    pub fn is_proven(self) -> bool {
        matches!(self, Self::Optimal | Self::Infeasible)
    }
}

/// Search counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes evaluated.
    pub nodes: u64,
    /// Nodes cut by the lower bound.
    pub pruned: u64,
    /// Complete schedules reached.
    pub feasible_leaves: u64,
    /// Nodes where some task could no longer fit before the horizon.
    pub infeasible_leaves: u64,
    /// Times the incumbent improved.
    pub incumbent_updates: u64,
    /// Wall-clock time (ms).
    pub elapsed_ms: u64,
}

impl SearchStats {
    /// Adds the counters of another worker. Elapsed time is not summed.
    pub fn merge(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.pruned += other.pruned;
        self.feasible_leaves += other.feasible_leaves;
        self.infeasible_leaves += other.infeasible_leaves;
        self.incumbent_updates += other.incumbent_updates;
    }
}

/// Solver configuration.
///
/// Deserializes from partial documents; missing fields take defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget (ms). `None` = unlimited.
    pub time_limit_ms: Option<u64>,
    /// Maximum search nodes. `None` = unlimited.
    pub node_limit: Option<u64>,
    /// Worker threads for the branch-and-bound. 1 = sequential.
    pub threads: usize,
    /// Distance from an integer under which solver output counts as integral.
    pub integrality_tolerance: f64,
    /// Seed the incumbent with a list-scheduling heuristic.
    pub warm_start: bool,
    /// Shrink the model horizon to a heuristic makespan before building.
    pub tighten_horizon: bool,
    /// Largest accepted task count × (horizon + 1).
    pub max_model_cells: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: None,
            node_limit: None,
            threads: 1,
            integrality_tolerance: 1e-6,
            warm_start: true,
            tighten_horizon: false,
            max_model_cells: DEFAULT_CELL_LIMIT,
        }
    }
}

impl SolverConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit (ms).
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Sets the node limit.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// Sets the number of worker threads (at least 1).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Sets the integrality tolerance.
    pub fn with_integrality_tolerance(mut self, tolerance: f64) -> Self {
        self.integrality_tolerance = tolerance;
        self
    }

    /// Enables or disables the heuristic warm start.
    pub fn with_warm_start(mut self, enabled: bool) -> Self {
        self.warm_start = enabled;
        self
    }

    /// Enables or disables horizon tightening.
    pub fn with_tighten_horizon(mut self, enabled: bool) -> Self {
        self.tighten_horizon = enabled;
        self
    }

    /// Sets the model cell limit.
    pub fn with_max_model_cells(mut self, cells: u64) -> Self {
        self.max_model_cells = cells;
        self
    }

    /// Time limit as a `Duration`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Deadline for a search starting at `start`.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.time_limit().map(|limit| start + limit)
    }
}

/// Result of solving a `LinearModel`.
#[derive(Debug, Clone)]
pub struct LinearSolution {
    /// Outcome.
    pub status: SolveStatus,
    /// Value per variable (indexed by `VarId`), when an assignment exists.
    pub values: Option<Vec<f64>>,
    /// Objective value of `values`.
    pub objective: Option<f64>,
    /// Search counters (zero for backends that do not report them).
    pub stats: SearchStats,
}

impl LinearSolution {
    /// A solution without an assignment.
    pub fn without_assignment(status: SolveStatus, stats: SearchStats) -> Self {
        Self {
            status,
            values: None,
            objective: None,
            stats,
        }
    }

    /// Whether an assignment is present.
    pub fn has_assignment(&self) -> bool {
        self.values.is_some()
    }
}

/// A backend that minimizes a [`LinearModel`].
///
/// Implementations must never report `Infeasible` for a failure to run;
/// that is `ScheduleError::SolverUnavailable`.
pub trait LinearSolver {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Solves the model.
    fn solve(&self, model: &LinearModel, config: &SolverConfig) -> Result<LinearSolution>;
}

impl<S: LinearSolver + ?Sized> LinearSolver for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &LinearModel, config: &SolverConfig) -> Result<LinearSolution> {
        (**self).solve(model, config)
    }
}

impl<S: LinearSolver + ?Sized> LinearSolver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &LinearModel, config: &SolverConfig) -> Result<LinearSolution> {
        (**self).solve(model, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let c = SolverConfig::default();
        assert_eq!(c.threads, 1);
        assert!(c.warm_start);
        assert!(!c.tighten_horizon);
        assert_eq!(c.max_model_cells, DEFAULT_CELL_LIMIT);
        assert!(c.time_limit().is_none());
        assert!((c.integrality_tolerance - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_config_builders() {
        let c = SolverConfig::new()
            .with_time_limit_ms(250)
            .with_node_limit(10_000)
            .with_threads(0)
            .with_warm_start(false)
            .with_tighten_horizon(true)
            .with_max_model_cells(64);
        assert_eq!(c.time_limit(), Some(Duration::from_millis(250)));
        assert_eq!(c.max_model_cells, 64);
        assert_eq!(c.node_limit, Some(10_000));
        assert_eq!(c.threads, 1);
        assert!(!c.warm_start);
        assert!(c.tighten_horizon);
    }

    #[test]
    fn test_config_partial_json() {
        let c: SolverConfig = serde_json::from_str(r#"{"threads": 4, "time_limit_ms": 1000}"#).unwrap();
        assert_eq!(c.threads, 4);
        assert_eq!(c.time_limit_ms, Some(1000));
        assert!(c.warm_start);
        assert!(c.node_limit.is_none());
    }

    #[test]
    fn test_status_is_proven() {
        assert!(SolveStatus::Optimal.is_proven());
        assert!(SolveStatus::Infeasible.is_proven());
        assert!(!SolveStatus::Feasible.is_proven());
        assert!(!SolveStatus::TimedOut.is_proven());
    }

    #[test]
    fn test_stats_merge() {
        let mut a = SearchStats {
            nodes: 10,
            pruned: 2,
            elapsed_ms: 5,
            ..Default::default()
        };
        let b = SearchStats {
            nodes: 7,
            feasible_leaves: 1,
            incumbent_updates: 1,
            elapsed_ms: 9,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.nodes, 17);
        assert_eq!(a.pruned, 2);
        assert_eq!(a.feasible_leaves, 1);
        assert_eq!(a.incumbent_updates, 1);
        assert_eq!(a.elapsed_ms, 5);
    }
}
