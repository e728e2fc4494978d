//! MILP formulation of resource-constrained project scheduling.
//!
//! Bridges the domain models to any solver implementing
//! [`LinearSolver`](crate::solver::LinearSolver). The builder emits a
//! solver-neutral [`LinearModel`]; backends either consume it directly
//! (external MILP solvers via [`LinearModel::to_cplex_lp`]) or recover
//! the project network from it ([`LinearModel::recover_network`]).
//!
//! # Reference
//! Pritsker, Watters & Wolfe (1969), "Multiproject Scheduling with
//! Limited Resources: A Zero-One Programming Approach"

mod builder;
mod linear;

pub use builder::{ModelBuilder, DEFAULT_CELL_LIMIT};
pub use linear::{
    ConstraintFamily, LinearConstraint, LinearModel, Sense, VarDomain, VarId, VarRole, Variable,
};
