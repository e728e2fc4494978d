//! Minimum-makespan scheduling of a single project on one renewable resource.
//!
//! Given tasks with integer durations, resource demands and precedence
//! relations, and a resource of fixed capacity, finds start times that
//! respect every precedence, never exceed the capacity at any time unit,
//! and minimize the makespan (RCPSP, `PS | prec | C_max`).
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Project`, `Schedule`
//! - **`validation`**: Input integrity checks (duplicate IDs, DAG cycles, demand vs capacity)
//! - **`network`**: Indexed precedence network, critical path, lower bounds
//! - **`formulation`**: Time-indexed MILP model and its builder
//! - **`solver`**: `LinearSolver` backends: branch-and-bound, exhaustive, GLPK
//! - **`scheduler`**: `ProjectScheduler` (exact), `ListScheduler` (heuristic), KPIs
//! - **`generator`**: Seeded random instances
//!
//! # Example
//!
//! ```
//! use u_rcpsp::models::{Project, Task};
//! use u_rcpsp::scheduler::ProjectScheduler;
//!
//! let project = Project::new(5).with_tasks([
//!     Task::new("A").with_duration(2).with_demand(3),
//!     Task::new("B").with_duration(3).with_demand(2),
//!     Task::new("C").with_duration(5).with_demand(4).with_predecessor("A"),
//!     Task::new("D").with_duration(4).with_demand(1).with_predecessors(["A", "B"]),
//!     Task::new("E").with_duration(3).with_demand(5).with_predecessor("D"),
//!     Task::new("F").with_duration(2).with_demand(3).with_predecessors(["B", "C"]),
//!     Task::new("G").with_duration(3).with_demand(3).with_predecessors(["E", "F"]),
//! ]);
//!
//! let solution = ProjectScheduler::new().solve(&project).unwrap();
//! assert!(solution.is_optimal());
//! assert_eq!(solution.makespan, Some(16));
//! ```
//!
//! # References
//!
//! - Pritsker, Watters & Wolfe (1969), "Multiproject Scheduling with Limited Resources"
//! - Brucker et al. (1999), "Resource-Constrained Project Scheduling: Notation,
//!   Classification, Models, and Methods"
//! - Demeulemeester & Herroelen (2002), "Project Scheduling: A Research Handbook"

pub mod error;
pub mod formulation;
pub mod generator;
pub mod models;
pub mod network;
pub mod scheduler;
pub mod solver;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use error::{Result, ScheduleError};
pub use models::{Project, Schedule, Task};
pub use scheduler::{ProjectScheduler, Solution};
pub use solver::{SolveStatus, SolverConfig};
