//! Schedulers and KPI evaluation.
//!
//! # Schedulers
//!
//! - [`ProjectScheduler`]: exact minimum-makespan scheduling through the
//!   MILP formulation and a pluggable [`LinearSolver`](crate::solver::LinearSolver).
//! - [`ListScheduler`]: priority-rule heuristic. Not optimal, but provides
//!   fast baseline solutions and horizon estimates.
//!
//! # KPI
//!
//! `ScheduleKpi` computes makespan, lower bound and gap, utilization, and
//! idle capacity.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Brucker et al. (1999), "Resource-Constrained Project Scheduling:
//!   Notation, Classification, Models, and Methods"

mod kpi;
mod list;
mod planner;

pub use kpi::ScheduleKpi;
pub use list::ListScheduler;
pub use planner::{ProjectScheduler, Solution};
