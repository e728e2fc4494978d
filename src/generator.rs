//! Seeded random project instances.
//!
//! Tasks are numbered `T01`, `T02`, …; every precedence edge points from
//! a lower to a higher task number, so generated networks are acyclic.
//! Demands never exceed the capacity, so every instance has a schedule
//! within the default horizon.
//!
//! # Usage
//! ```
//! use u_rcpsp::generator::{generate_project, ProjectGeneratorConfig};
//! use u_rcpsp::validation::validate_project;
//!
//! let project = generate_project(&ProjectGeneratorConfig::small(), 7);
//! assert_eq!(project.task_count(), 12);
//! assert!(validate_project(&project).is_ok());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::{Project, Task};

/// Random project parameters. Ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGeneratorConfig {
    /// Number of tasks.
    pub task_count: usize,
    /// Shortest task duration.
    pub min_duration: i64,
    /// Longest task duration.
    pub max_duration: i64,
    /// Smallest demand.
    pub min_demand: i64,
    /// Largest demand (clamped to `capacity`).
    pub max_demand: i64,
    /// Resource capacity.
    pub capacity: i64,
    /// Chance that an earlier task becomes a predecessor.
    pub edge_probability: f64,
    /// Most predecessors per task.
    pub max_predecessors: usize,
}

impl ProjectGeneratorConfig {
    /// 7 tasks; small enough to certify by exhaustive enumeration.
    pub fn tiny() -> Self {
        Self {
            task_count: 7,
            min_duration: 1,
            max_duration: 4,
            min_demand: 0,
            max_demand: 3,
            capacity: 4,
            edge_probability: 0.3,
            max_predecessors: 2,
        }
    }

    /// 12 tasks.
    pub fn small() -> Self {
        Self {
            task_count: 12,
            min_duration: 1,
            max_duration: 6,
            min_demand: 1,
            max_demand: 4,
            capacity: 6,
            edge_probability: 0.25,
            max_predecessors: 3,
        }
    }

    /// 30 tasks.
    pub fn medium() -> Self {
        Self {
            task_count: 30,
            min_duration: 1,
            max_duration: 10,
            min_demand: 1,
            max_demand: 6,
            capacity: 10,
            edge_probability: 0.15,
            max_predecessors: 3,
        }
    }

    /// Sets the number of tasks.
    pub fn with_task_count(mut self, task_count: usize) -> Self {
        self.task_count = task_count;
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for ProjectGeneratorConfig {
    fn default() -> Self {
        Self::small()
    }
}

/// Generates a project. The same config and seed give the same project.
pub fn generate_project(config: &ProjectGeneratorConfig, seed: u64) -> Project {
    let mut rng = StdRng::seed_from_u64(seed);
    let capacity = config.capacity.max(1);
    let min_duration = config.min_duration.max(1);
    let max_duration = config.max_duration.max(min_duration);
    let min_demand = config.min_demand.clamp(0, capacity);
    let max_demand = config.max_demand.clamp(min_demand, capacity);
    let edge_probability = config.edge_probability.clamp(0.0, 1.0);

    let ids: Vec<String> = (1..=config.task_count).map(|k| format!("T{k:02}")).collect();
    let mut project = Project::new(capacity).with_name(format!("random-{seed}"));

    for j in 0..config.task_count {
        let mut task = Task::new(&ids[j])
            .with_duration(rng.random_range(min_duration..=max_duration))
            .with_demand(rng.random_range(min_demand..=max_demand));

        let mut preds = 0;
        for i in (0..j).rev() {
            if preds == config.max_predecessors {
                break;
            }
            if rng.random_bool(edge_probability) {
                task = task.with_predecessor(&ids[i]);
                preds += 1;
            }
        }
        project = project.with_task(task);
    }

    project
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_project;

    #[test]
    fn test_presets_generate_valid_projects() {
        for config in [
            ProjectGeneratorConfig::tiny(),
            ProjectGeneratorConfig::small(),
            ProjectGeneratorConfig::medium(),
        ] {
            for seed in 0..10 {
                let project = generate_project(&config, seed);
                assert_eq!(project.task_count(), config.task_count);
                assert!(validate_project(&project).is_ok(), "seed {seed}");
            }
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let config = ProjectGeneratorConfig::small();
        let a = generate_project(&config, 42);
        let b = generate_project(&config, 42);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_edges_point_forward() {
        let project = generate_project(&ProjectGeneratorConfig::medium(), 3);
        for task in &project.tasks {
            assert!(task.predecessors.len() <= 3);
            for pred in &task.predecessors {
                assert!(pred < &task.id);
            }
        }
    }

    #[test]
    fn test_ranges_respected() {
        let config = ProjectGeneratorConfig::tiny().with_capacity(2);
        let project = generate_project(&config, 9);
        assert_eq!(project.capacity, 2);
        for task in &project.tasks {
            assert!((1..=4).contains(&task.duration));
            assert!((0..=2).contains(&task.demand));
        }
    }

    #[test]
    fn test_zero_edge_probability() {
        let mut config = ProjectGeneratorConfig::small();
        config.edge_probability = 0.0;
        let project = generate_project(&config, 1);
        assert!(project.tasks.iter().all(|t| t.predecessors.is_empty()));
    }
}
