//! Exhaustive enumeration of task lists.
//!
//! Runs the serial SGS on every precedence-feasible task list. Since
//! those lists generate all active schedules, the best one is optimal.
//! Cost grows factorially with the number of unrelated tasks, so this is
//! a reference for small instances only.

use std::time::Instant;

use tracing::debug;

use super::sgs::serial_sgs;
use super::{LinearSolution, LinearSolver, SearchStats, SolveStatus, SolverConfig};
use crate::error::{Result, ScheduleError};
use crate::formulation::LinearModel;
use crate::network::ProjectNetwork;

/// Default task limit of `ExhaustiveSolver`.
const DEFAULT_MAX_TASKS: usize = 9;

/// Minimum makespan over every precedence-feasible task list.
///
/// Returns `(makespan, starts)`, or `None` if no list fits in the horizon.
/// Among equal makespans the first list in lexicographic index order wins.
pub fn exhaustive_search(net: &ProjectNetwork) -> Option<(i64, Vec<i64>)> {
    enumerate(net, &mut SearchStats::default())
}

fn enumerate(net: &ProjectNetwork, stats: &mut SearchStats) -> Option<(i64, Vec<i64>)> {
    let mut state = Enumeration {
        net,
        remaining: (0..net.len()).map(|i| net.predecessors(i).len()).collect(),
        listed: vec![false; net.len()],
        list: Vec::with_capacity(net.len()),
        best: None,
    };
    state.extend(stats);
    state.best
}

struct Enumeration<'a> {
    net: &'a ProjectNetwork,
    remaining: Vec<usize>,
    listed: Vec<bool>,
    list: Vec<usize>,
    best: Option<(i64, Vec<i64>)>,
}

impl Enumeration<'_> {
    fn extend(&mut self, stats: &mut SearchStats) {
        let n = self.net.len();
        if self.list.len() == n {
            stats.nodes += 1;
            match serial_sgs(self.net, &self.list) {
                Some(starts) => {
                    stats.feasible_leaves += 1;
                    let makespan = self.net.makespan_of(&starts);
                    if self.best.as_ref().map_or(true, |(m, _)| makespan < *m) {
                        stats.incumbent_updates += 1;
                        self.best = Some((makespan, starts));
                    }
                }
                None => stats.infeasible_leaves += 1,
            }
            return;
        }

        for j in 0..n {
            if self.listed[j] || self.remaining[j] > 0 {
                continue;
            }
            self.listed[j] = true;
            self.list.push(j);
            for &s in self.net.successors(j) {
                self.remaining[s] -= 1;
            }

            self.extend(stats);

            for &s in self.net.successors(j) {
                self.remaining[s] += 1;
            }
            self.list.pop();
            self.listed[j] = false;
        }
    }
}

/// Certifying solver for small models.
///
/// Ignores time and node limits: the enumeration always completes.
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_tasks: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
        }
    }
}

impl ExhaustiveSolver {
    /// Creates a solver with the default task limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest task count accepted.
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Largest task count accepted.
    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }
}

impl LinearSolver for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn solve(&self, model: &LinearModel, _config: &SolverConfig) -> Result<LinearSolution> {
        let net = model.recover_network()?;
        if net.len() > self.max_tasks {
            return Err(ScheduleError::unsupported_model(format!(
                "{} tasks exceed the exhaustive limit of {}",
                net.len(),
                self.max_tasks
            )));
        }

        let started = Instant::now();
        let mut stats = SearchStats::default();
        let best = enumerate(&net, &mut stats);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(lists = stats.nodes, best = ?best.as_ref().map(|(m, _)| *m), "enumeration finished");

        Ok(match best {
            Some((makespan, starts)) => LinearSolution {
                status: SolveStatus::Optimal,
                values: Some(model.values_from_starts(&starts, net.durations())),
                objective: Some(makespan as f64),
                stats,
            },
            None => LinearSolution::without_assignment(SolveStatus::Infeasible, stats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{diamond_project, example_project};
    use crate::formulation::ModelBuilder;
    use crate::generator::{generate_project, ProjectGeneratorConfig};
    use crate::models::{Project, Task};
    use crate::solver::BranchAndBound;

    /// Minimum makespan over every start vector within the horizon, judged
    /// by `check_starts` alone. Tasks must be numbered in topological order.
    fn start_time_minimum(net: &ProjectNetwork) -> Option<i64> {
        fn assign(net: &ProjectNetwork, starts: &mut Vec<i64>, best: &mut Option<i64>) {
            let j = starts.len();
            if j == net.len() {
                if net.check_starts(starts).is_ok() {
                    let makespan = net.makespan_of(starts);
                    if best.map_or(true, |b| makespan < b) {
                        *best = Some(makespan);
                    }
                }
                return;
            }
            let release = net
                .predecessors(j)
                .iter()
                .map(|&p| starts[p] + net.duration(p))
                .max()
                .unwrap_or(0);
            for start in release..=net.horizon() - net.duration(j) {
                if best.is_some_and(|b| start + net.duration(j) >= b) {
                    break;
                }
                starts.push(start);
                assign(net, starts, best);
                starts.pop();
            }
        }

        let mut best = None;
        assign(net, &mut Vec::with_capacity(net.len()), &mut best);
        best
    }

    #[test]
    fn test_example_optimum() {
        let net = ProjectNetwork::from_project(&example_project()).unwrap();
        let (makespan, starts) = exhaustive_search(&net).unwrap();
        assert_eq!(makespan, 16);
        assert!(net.check_starts(&starts).is_ok());
    }

    #[test]
    fn test_agrees_with_start_time_enumeration() {
        let mut config = ProjectGeneratorConfig::tiny().with_task_count(5);
        config.max_duration = 3;
        for seed in 0..10 {
            let net = ProjectNetwork::from_project(&generate_project(&config, seed)).unwrap();
            let expected = start_time_minimum(&net);
            assert_eq!(exhaustive_search(&net).map(|(m, _)| m), expected, "seed {seed}");
            let outcome = BranchAndBound::new().search(&net, &SolverConfig::default());
            assert_eq!(outcome.makespan, expected, "seed {seed}");
        }
    }

    #[test]
    fn test_start_time_enumeration_on_example() {
        let net = ProjectNetwork::from_project(&example_project()).unwrap();
        assert_eq!(start_time_minimum(&net), Some(16));
    }

    #[test]
    fn test_counts_every_topological_order() {
        // three unrelated tasks: 3! lists
        let project = Project::new(3).with_tasks([
            Task::new("A").with_demand(1),
            Task::new("B").with_demand(1),
            Task::new("C").with_demand(1),
        ]);
        let net = ProjectNetwork::from_project(&project).unwrap();
        let mut stats = SearchStats::default();
        let (makespan, _) = enumerate(&net, &mut stats).unwrap();
        assert_eq!(makespan, 1);
        assert_eq!(stats.nodes, 6);
        assert_eq!(stats.feasible_leaves, 6);
    }

    #[test]
    fn test_infeasible_horizon() {
        let net = ProjectNetwork::from_project(&diamond_project().with_horizon(6)).unwrap();
        assert!(exhaustive_search(&net).is_none());
    }

    #[test]
    fn test_solver_bridge() {
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let solution = ExhaustiveSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, Some(7.0));
        assert!(model.is_feasible(solution.values.as_ref().unwrap(), 1e-6));
    }

    #[test]
    fn test_rejects_large_models() {
        let project = example_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let err = ExhaustiveSolver::new()
            .with_max_tasks(5)
            .solve(&model, &SolverConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::UnsupportedModel(_)));
    }
}
