//! Depth-first branch-and-bound over active schedules.
//!
//! # Algorithm
//!
//! A node is a partial schedule: a set of tasks with fixed start times
//! and the resource profile they occupy. Its children schedule one
//! *eligible* task (all predecessors fixed) at that task's earliest
//! precedence- and resource-feasible start. Children are explored in
//! (earliest start, task ID) order.
//!
//! Every path from the root enumerates one precedence-feasible task list
//! through the serial schedule generation scheme, so the leaves are
//! exactly the active schedules and one of them is optimal.
//!
//! # Bounds
//!
//! For a node with eligible set `E` and earliest starts `est(j)`:
//! - the latest finish already fixed;
//! - `head(j) + tail(j)` for every unscheduled task, where heads start
//!   from fixed finishes and `est(j)` and propagate in topological order;
//! - `t0 + ⌈(remaining energy + fixed load after t0) / capacity⌉` with
//!   `t0 = min est(j)`.
//!
//! A node whose bound reaches the incumbent makespan is pruned. The root
//! bound `max(critical path, ⌈energy / capacity⌉)` ends the search early
//! once the incumbent meets it.
//!
//! # Parallelism
//! With `threads > 1` the top of the tree is expanded breadth-first into
//! a frontier of subtrees that a rayon pool explores concurrently. All
//! workers share one incumbent and one budget.
//!
//! # Reference
//! Demeulemeester & Herroelen (1992), "A Branch-and-Bound Procedure for
//! the Multiple Resource-Constrained Project Scheduling Problem"

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::incumbent::Incumbent;
use super::sgs::best_priority_schedule;
use super::{LinearSolution, LinearSolver, ResourceProfile, SearchStats, SolveStatus, SolverConfig};
use crate::error::Result;
use crate::formulation::LinearModel;
use crate::network::{div_ceil, ProjectNetwork};

/// Frontier subtrees per worker thread in parallel mode.
const SUBTREES_PER_THREAD: usize = 4;

/// Deadline checks happen every this many nodes.
const CLOCK_INTERVAL: u64 = 64;

/// Lifecycle of a search node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Not evaluated (the search stopped first).
    Unexplored,
    /// Children generated and explored.
    Branching,
    /// Lower bound reached the incumbent.
    Pruned,
    /// Complete schedule, verified.
    FeasibleLeaf,
    /// Some task can no longer finish by the horizon, or a complete
    /// schedule failed verification.
    InfeasibleLeaf,
}

/// Result of [`BranchAndBound::search`].
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Outcome.
    pub status: SolveStatus,
    /// Best start times found, indexed by task.
    pub starts: Option<Vec<i64>>,
    /// Makespan of `starts`.
    pub makespan: Option<i64>,
    /// Root lower bound.
    pub lower_bound: i64,
    /// State of the root node when the search ended.
    pub root: NodeState,
    /// Search counters.
    pub stats: SearchStats,
}

/// Exact branch-and-bound for single-resource project scheduling.
///
/// # Usage
/// ```
/// use u_rcpsp::models::{Project, Task};
/// use u_rcpsp::network::ProjectNetwork;
/// use u_rcpsp::solver::{BranchAndBound, SolveStatus, SolverConfig};
///
/// let project = Project::new(2).with_tasks([
///     Task::new("A").with_duration(2).with_demand(2),
///     Task::new("B").with_duration(3).with_demand(1),
///     Task::new("C").with_duration(1).with_demand(1).with_predecessor("A"),
/// ]);
/// let net = ProjectNetwork::from_project(&project).unwrap();
/// let outcome = BranchAndBound::new().search(&net, &SolverConfig::default());
/// assert_eq!(outcome.status, SolveStatus::Optimal);
/// assert_eq!(outcome.makespan, Some(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    /// Creates the solver.
    pub fn new() -> Self {
        Self
    }

    /// Minimizes the makespan of `net` within its horizon.
    pub fn search(&self, net: &ProjectNetwork, config: &SolverConfig) -> SearchOutcome {
        let started = Instant::now();
        let lower_bound = net.lower_bound();
        info!(
            tasks = net.len(),
            horizon = net.horizon(),
            lower_bound,
            threads = config.threads,
            "branch-and-bound started"
        );

        let mut outcome = self.run(net, config, lower_bound, started);
        outcome.stats.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            status = ?outcome.status,
            makespan = ?outcome.makespan,
            nodes = outcome.stats.nodes,
            pruned = outcome.stats.pruned,
            elapsed_ms = outcome.stats.elapsed_ms,
            "branch-and-bound finished"
        );
        outcome
    }

    fn run(
        &self,
        net: &ProjectNetwork,
        config: &SolverConfig,
        lower_bound: i64,
        started: Instant,
    ) -> SearchOutcome {
        if net.is_empty() {
            return SearchOutcome {
                status: SolveStatus::Optimal,
                starts: Some(Vec::new()),
                makespan: Some(0),
                lower_bound,
                root: NodeState::FeasibleLeaf,
                stats: SearchStats::default(),
            };
        }

        if lower_bound > net.horizon() {
            debug!(lower_bound, horizon = net.horizon(), "bound exceeds horizon");
            return SearchOutcome {
                status: SolveStatus::Infeasible,
                starts: None,
                makespan: None,
                lower_bound,
                root: NodeState::Unexplored,
                stats: SearchStats::default(),
            };
        }

        let incumbent = Incumbent::new(net.horizon() + 1);
        let budget = Budget::new(config, started);
        let mut stats = SearchStats::default();

        if config.warm_start {
            if let Some((makespan, starts)) = best_priority_schedule(net) {
                match net.check_starts(&starts) {
                    Ok(()) => {
                        if incumbent.offer(makespan, &starts) {
                            stats.incumbent_updates += 1;
                            debug!(makespan, "warm start");
                        }
                    }
                    Err(reason) => warn!(%reason, "discarding warm start schedule"),
                }
            }
        }

        let root = if incumbent.best() <= lower_bound {
            budget.finish();
            NodeState::Unexplored
        } else if config.threads > 1 {
            self.run_parallel(net, config.threads, &incumbent, &budget, lower_bound, &mut stats)
        } else {
            let mut worker = Worker::new(net, &incumbent, &budget, lower_bound);
            let mut node = Node::root(net);
            let state = worker.visit(&mut node);
            stats.merge(&worker.stats);
            state
        };

        let status = if budget.is_finished() {
            SolveStatus::Optimal
        } else if budget.is_exhausted() {
            warn!(nodes = budget.nodes(), "search budget exhausted");
            SolveStatus::TimedOut
        } else if incumbent.has_schedule() {
            SolveStatus::Optimal
        } else {
            SolveStatus::Infeasible
        };

        let best = incumbent.into_best();
        SearchOutcome {
            status,
            makespan: best.as_ref().map(|(m, _)| *m),
            starts: best.map(|(_, s)| s),
            lower_bound,
            root,
            stats,
        }
    }

    fn run_parallel(
        &self,
        net: &ProjectNetwork,
        threads: usize,
        incumbent: &Incumbent,
        budget: &Budget,
        lower_bound: i64,
        stats: &mut SearchStats,
    ) -> NodeState {
        let (frontier, root) = split_frontier(net, threads * SUBTREES_PER_THREAD, stats);
        debug!(subtrees = frontier.len(), "frontier split");

        let explore = |path: &Vec<(usize, i64)>| {
            let mut worker = Worker::new(net, incumbent, budget, lower_bound);
            let mut node = Node::root(net);
            for &(task, start) in path {
                node.apply(task, start);
            }
            worker.visit(&mut node);
            worker.stats
        };

        let results: Vec<SearchStats> = match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
        {
            Ok(pool) => pool.install(|| frontier.par_iter().map(explore).collect()),
            Err(err) => {
                warn!(%err, "thread pool unavailable, searching sequentially");
                frontier.iter().map(explore).collect()
            }
        };

        for s in &results {
            stats.merge(s);
        }
        root
    }
}

impl LinearSolver for BranchAndBound {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn solve(&self, model: &LinearModel, config: &SolverConfig) -> Result<LinearSolution> {
        let net = model.recover_network()?;
        let outcome = self.search(&net, config);

        Ok(LinearSolution {
            status: outcome.status,
            values: outcome
                .starts
                .as_ref()
                .map(|starts| model.values_from_starts(starts, net.durations())),
            objective: outcome.makespan.map(|m| m as f64),
            stats: outcome.stats,
        })
    }
}

/// Shared search budget and stop flags.
struct Budget {
    deadline: Option<Instant>,
    node_limit: Option<u64>,
    nodes: AtomicU64,
    exhausted: AtomicBool,
    finished: AtomicBool,
}

impl Budget {
    fn new(config: &SolverConfig, started: Instant) -> Self {
        Self {
            deadline: config.deadline_from(started),
            node_limit: config.node_limit,
            nodes: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    /// Counts a node. Returns `false` if the search must stop instead.
    fn tick(&self) -> bool {
        if self.should_stop() {
            return false;
        }
        let n = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        let over_nodes = self.node_limit.is_some_and(|limit| n > limit);
        let over_time = (n == 1 || n % CLOCK_INTERVAL == 0)
            && self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_nodes || over_time {
            self.exhausted.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }

    fn should_stop(&self) -> bool {
        self.is_exhausted() || self.is_finished()
    }

    /// Marks the incumbent as proven optimal.
    fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }

    fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }
}

/// Partial schedule, modified in place with apply/undo.
struct Node<'a> {
    net: &'a ProjectNetwork,
    profile: ResourceProfile,
    starts: Vec<Option<i64>>,
    unscheduled_preds: Vec<usize>,
    scheduled: usize,
    max_finish: i64,
    remaining_energy: i64,
}

impl<'a> Node<'a> {
    fn root(net: &'a ProjectNetwork) -> Self {
        Self {
            net,
            profile: ResourceProfile::new(net.capacity(), net.horizon()),
            starts: vec![None; net.len()],
            unscheduled_preds: (0..net.len()).map(|i| net.predecessors(i).len()).collect(),
            scheduled: 0,
            max_finish: 0,
            remaining_energy: net.total_energy(),
        }
    }

    fn is_complete(&self) -> bool {
        self.scheduled == self.net.len()
    }

    /// Fixes `task` at `start`. Returns the previous latest finish for `undo`.
    fn apply(&mut self, task: usize, start: i64) -> i64 {
        let (d, r) = (self.net.duration(task), self.net.demand(task));
        let previous = self.max_finish;
        self.profile.add(start, d, r);
        self.starts[task] = Some(start);
        for &s in self.net.successors(task) {
            self.unscheduled_preds[s] -= 1;
        }
        self.scheduled += 1;
        self.max_finish = previous.max(start + d);
        self.remaining_energy -= d * r;
        previous
    }

    fn undo(&mut self, task: usize, start: i64, previous: i64) {
        let (d, r) = (self.net.duration(task), self.net.demand(task));
        self.profile.remove(start, d, r);
        self.starts[task] = None;
        for &s in self.net.successors(task) {
            self.unscheduled_preds[s] += 1;
        }
        self.scheduled -= 1;
        self.max_finish = previous;
        self.remaining_energy += d * r;
    }

    /// Eligible tasks with their earliest feasible starts, ordered by
    /// (start, task ID). `None` if some eligible task cannot fit.
    fn branches(&self) -> Option<Vec<(usize, i64)>> {
        let net = self.net;
        let mut branches = Vec::new();
        for j in 0..net.len() {
            if self.starts[j].is_some() || self.unscheduled_preds[j] > 0 {
                continue;
            }
            let release = net
                .predecessors(j)
                .iter()
                .filter_map(|&p| self.starts[p].map(|s| s + net.duration(p)))
                .max()
                .unwrap_or(0);
            let start = self.profile.earliest_fit(release, net.duration(j), net.demand(j))?;
            branches.push((j, start));
        }
        branches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| net.id(a.0).cmp(net.id(b.0))));
        Some(branches)
    }

    /// Lower bound on the makespan of every completion of this node.
    fn lower_bound(&self, branches: &[(usize, i64)]) -> i64 {
        let net = self.net;
        let mut bound = self.max_finish;

        let mut heads: Vec<Option<i64>> = vec![None; net.len()];
        for &(j, start) in branches {
            heads[j] = Some(start);
        }
        for &j in net.topological_order() {
            if self.starts[j].is_some() {
                continue;
            }
            let head = match heads[j] {
                Some(h) => h,
                None => {
                    let h = net
                        .predecessors(j)
                        .iter()
                        .map(|&p| match self.starts[p] {
                            Some(s) => s + net.duration(p),
                            None => heads[p].unwrap_or(0) + net.duration(p),
                        })
                        .max()
                        .unwrap_or(0);
                    heads[j] = Some(h);
                    h
                }
            };
            bound = bound.max(head + net.tail(j));
        }

        if let Some(t0) = branches.iter().map(|&(_, s)| s).min() {
            let energy = self.remaining_energy + self.profile.load_from(t0);
            if energy > 0 && net.capacity() > 0 {
                bound = bound.max(t0 + div_ceil(energy, net.capacity()));
            }
        }

        bound
    }

    fn start_vector(&self) -> Option<Vec<i64>> {
        self.starts.iter().copied().collect()
    }
}

/// One depth-first explorer with its own counters.
struct Worker<'a> {
    net: &'a ProjectNetwork,
    incumbent: &'a Incumbent,
    budget: &'a Budget,
    root_bound: i64,
    stats: SearchStats,
}

impl<'a> Worker<'a> {
    fn new(
        net: &'a ProjectNetwork,
        incumbent: &'a Incumbent,
        budget: &'a Budget,
        root_bound: i64,
    ) -> Self {
        Self {
            net,
            incumbent,
            budget,
            root_bound,
            stats: SearchStats::default(),
        }
    }

    fn visit(&mut self, node: &mut Node<'_>) -> NodeState {
        if !self.budget.tick() {
            return NodeState::Unexplored;
        }
        self.stats.nodes += 1;

        if node.is_complete() {
            return self.accept(node);
        }

        let Some(branches) = node.branches() else {
            self.stats.infeasible_leaves += 1;
            return NodeState::InfeasibleLeaf;
        };

        if node.lower_bound(&branches) >= self.incumbent.best() {
            self.stats.pruned += 1;
            return NodeState::Pruned;
        }

        for (task, start) in branches {
            if self.budget.should_stop() {
                break;
            }
            let previous = node.apply(task, start);
            self.visit(node);
            node.undo(task, start, previous);
        }
        NodeState::Branching
    }

    fn accept(&mut self, node: &Node<'_>) -> NodeState {
        let checked = node
            .start_vector()
            .ok_or_else(|| "incomplete start vector".to_string())
            .and_then(|starts| self.net.check_starts(&starts).map(|()| starts));

        let starts = match checked {
            Ok(starts) => starts,
            Err(reason) => {
                warn!(%reason, "rejected complete schedule");
                self.stats.infeasible_leaves += 1;
                return NodeState::InfeasibleLeaf;
            }
        };

        self.stats.feasible_leaves += 1;
        let makespan = self.net.makespan_of(&starts);
        if self.incumbent.offer(makespan, &starts) {
            self.stats.incumbent_updates += 1;
            debug!(makespan, "incumbent improved");
            if makespan <= self.root_bound {
                self.budget.finish();
            }
        }
        NodeState::FeasibleLeaf
    }
}

/// Expands the tree breadth-first until at least `target` subtrees exist
/// or no node can be expanded further.
///
/// Returns the subtree roots as decision paths and the state of the root.
fn split_frontier(
    net: &ProjectNetwork,
    target: usize,
    stats: &mut SearchStats,
) -> (Vec<Vec<(usize, i64)>>, NodeState) {
    let mut frontier: Vec<Vec<(usize, i64)>> = vec![Vec::new()];
    let mut root = NodeState::Unexplored;

    while frontier.len() < target {
        let mut next = Vec::with_capacity(frontier.len() * 2);
        let mut grew = false;

        for path in frontier {
            if path.len() == net.len() {
                next.push(path);
                continue;
            }
            let mut node = Node::root(net);
            for &(task, start) in &path {
                node.apply(task, start);
            }
            let state = match node.branches() {
                Some(children) => {
                    grew = true;
                    for child in children {
                        let mut extended = path.clone();
                        extended.push(child);
                        next.push(extended);
                    }
                    NodeState::Branching
                }
                None => {
                    stats.infeasible_leaves += 1;
                    NodeState::InfeasibleLeaf
                }
            };
            if path.is_empty() {
                root = state;
            }
        }

        frontier = next;
        if !grew {
            break;
        }
    }

    (frontier, root)
}
