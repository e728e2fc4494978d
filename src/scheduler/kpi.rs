//! Schedule quality metrics (KPIs).
//!
//! Computes performance indicators of a schedule against its project.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest finish time |
//! | Lower Bound | max(critical path, ⌈energy / capacity⌉) |
//! | Optimality Gap | (C_max - LB) / LB |
//! | Avg Utilization | Σ duration·demand / (capacity · C_max) |
//! | Peak Usage | Highest units in use at any time |
//! | Idle Capacity | capacity · C_max - Σ duration·demand |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Project, Schedule};
use crate::network::ProjectNetwork;

/// Schedule performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Latest finish time.
    pub makespan: i64,
    /// Project lower bound.
    pub lower_bound: i64,
    /// Relative distance to the lower bound (0.0 = provably optimal).
    pub optimality_gap: f64,
    /// Longest precedence chain.
    pub critical_path_length: i64,
    /// Fraction of the capacity-time area in use (0.0..1.0).
    pub avg_utilization: f64,
    /// Highest usage at any time unit.
    pub peak_usage: i64,
    /// Unused capacity-time units before the makespan.
    pub idle_capacity: i64,
    /// Scheduled tasks.
    pub task_count: usize,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its project.
    ///
    /// # Errors
    /// `MalformedProject` if the project has unknown predecessors or a cycle.
    pub fn calculate(schedule: &Schedule, project: &Project) -> Result<Self> {
        let net = ProjectNetwork::from_project(project)?;
        let makespan = schedule.makespan();
        let lower_bound = net.lower_bound();
        let used: i64 = schedule
            .entries
            .iter()
            .map(|e| e.duration() * e.demand)
            .sum();
        let area = project.capacity * makespan;

        let avg_utilization = if area > 0 {
            used as f64 / area as f64
        } else {
            0.0
        };
        let optimality_gap = if lower_bound > 0 {
            (makespan - lower_bound) as f64 / lower_bound as f64
        } else {
            0.0
        };

        Ok(Self {
            makespan,
            lower_bound,
            optimality_gap,
            critical_path_length: net.critical_path_length(),
            avg_utilization,
            peak_usage: schedule.peak_usage(),
            idle_capacity: area - used,
            task_count: schedule.entry_count(),
        })
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_gap: f64, min_utilization: f64) -> bool {
        self.optimality_gap <= max_gap && self.avg_utilization >= min_utilization
    }

    /// Whether the makespan meets the lower bound.
    pub fn is_provably_optimal(&self) -> bool {
        self.makespan == self.lower_bound
    }
}
