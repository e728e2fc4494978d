//! Shared test projects.

use crate::models::{Project, Task};

/// Seven tasks A–G on a resource of capacity 5.
pub(crate) fn example_project() -> Project {
    Project::new(5).with_name("example").with_tasks([
        Task::new("A").with_duration(2).with_demand(3),
        Task::new("B").with_duration(3).with_demand(2),
        Task::new("C").with_duration(5).with_demand(4).with_predecessor("A"),
        Task::new("D").with_duration(4).with_demand(1).with_predecessors(["A", "B"]),
        Task::new("E").with_duration(3).with_demand(5).with_predecessor("D"),
        Task::new("F").with_duration(2).with_demand(3).with_predecessors(["B", "C"]),
        Task::new("G").with_duration(3).with_demand(3).with_predecessors(["E", "F"]),
    ])
}

/// Two independent tasks that cannot overlap, then a join.
pub(crate) fn diamond_project() -> Project {
    Project::new(4).with_name("diamond").with_tasks([
        Task::new("S").with_duration(1).with_demand(1),
        Task::new("L").with_duration(3).with_demand(3).with_predecessor("S"),
        Task::new("R").with_duration(2).with_demand(2).with_predecessor("S"),
        Task::new("T").with_duration(1).with_demand(1).with_predecessors(["L", "R"]),
    ])
}
