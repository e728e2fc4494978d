//! Project scheduling domain models.
//!
//! Provides the core data types for representing a resource-constrained
//! project and its solution.
//!
//! # Domain Mappings
//!
//! | u-rcpsp | Construction | Software | Events |
//! |---------|-------------|----------|--------|
//! | Task | Work package | Ticket | Setup step |
//! | Project | Site plan | Release | Venue build |
//! | capacity | Crew size | Engineers | Stagehands |
//! | Schedule | Gantt chart | Sprint plan | Run sheet |

mod project;
mod schedule;
mod task;

pub use project::Project;
pub use schedule::{Schedule, ScheduledTask, Violation, ViolationType};
pub use task::Task;
