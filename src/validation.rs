//! Input validation for project scheduling problems.
//!
//! Checks structural integrity of a project before any model is built.
//! Detects:
//! - Duplicate task IDs
//! - Predecessor references to missing tasks
//! - Circular precedence dependencies (DAG validation)
//! - Non-positive durations and negative demands
//! - Demands exceeding the resource capacity
//! - Non-positive capacity or horizon override
//! - Duration or energy totals that do not fit in `i64`
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use crate::models::Project;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A task references a predecessor that doesn't exist.
    InvalidPredecessor,
    /// Precedence graph contains a cycle.
    CyclicDependency,
    /// A task has zero or negative duration.
    NonPositiveDuration,
    /// A task has negative resource demand.
    NegativeDemand,
    /// A task demands more units than the resource provides.
    DemandExceedsCapacity,
    /// The resource capacity is zero or negative.
    NonPositiveCapacity,
    /// The horizon override is zero or negative.
    NonPositiveHorizon,
    /// The sum of all durations does not fit in `i64`.
    HorizonOverflow,
    /// The sum of duration × demand does not fit in `i64`.
    EnergyOverflow,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this error only says a task can never fit the resource.
    ///
    /// Such a project is well-formed but has no feasible schedule.
    pub fn is_capacity_excess(&self) -> bool {
        self.kind == ValidationErrorKind::DemandExceedsCapacity
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates a project.
///
/// Checks:
/// 1. Capacity is positive
/// 2. Horizon override (if any) is positive
/// 3. No duplicate task IDs
/// 4. Durations are positive, demands are non-negative
/// 5. No demand exceeds capacity
/// 6. All predecessor references point to existing tasks
/// 7. No circular precedence dependencies
/// 8. Total duration and total energy fit in `i64`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_project(project: &Project) -> ValidationResult {
    let mut errors = Vec::new();

    if project.capacity <= 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonPositiveCapacity,
            format!("Resource capacity must be positive, got {}", project.capacity),
        ));
    }

    if let Some(horizon) = project.horizon {
        if horizon <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveHorizon,
                format!("Horizon must be positive, got {horizon}"),
            ));
        }
    }

    let mut task_ids = HashSet::new();
    for task in &project.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }

        if task.duration <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveDuration,
                format!("Task '{}' has non-positive duration {}", task.id, task.duration),
            ));
        }

        if task.demand < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeDemand,
                format!("Task '{}' has negative demand {}", task.id, task.demand),
            ));
        } else if project.capacity > 0 && task.demand > project.capacity {
            errors.push(ValidationError::new(
                ValidationErrorKind::DemandExceedsCapacity,
                format!(
                    "Task '{}' demands {} units but capacity is {}",
                    task.id, task.demand, project.capacity
                ),
            ));
        }
    }

    // Check predecessor references
    for task in &project.tasks {
        for pred in &task.predecessors {
            if !task_ids.contains(pred.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!(
                        "Task '{}' references unknown predecessor '{}'",
                        task.id, pred
                    ),
                ));
            }
        }
    }

    // Check for cycles in precedence graph (DFS-based)
    if let Some(cycle_err) = detect_cycles(project) {
        errors.push(cycle_err);
    }

    errors.extend(check_totals(project));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Exact duration and energy totals over tasks with valid values.
///
/// The default horizon and every longest-path quantity are bounded by
/// the duration total, so a project passing this check cannot overflow
/// in later stages.
fn check_totals(project: &Project) -> Vec<ValidationError> {
    let valid = || {
        project
            .tasks
            .iter()
            .filter(|t| t.duration > 0 && t.demand >= 0)
    };
    let mut errors = Vec::new();

    let duration = valid().try_fold(0i64, |acc, t| acc.checked_add(t.duration));
    if duration.is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::HorizonOverflow,
            "Sum of task durations exceeds the i64 range",
        ));
    }

    let energy = valid().try_fold(0i64, |acc, t| {
        t.duration
            .checked_mul(t.demand)
            .and_then(|e| acc.checked_add(e))
    });
    if energy.is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EnergyOverflow,
            "Sum of task duration × demand exceeds the i64 range",
        ));
    }

    errors
}

/// Detects cycles in the precedence graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists. Roots are visited
/// in ID order so the reported task is deterministic.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(project: &Project) -> Option<ValidationError> {
    // Build adjacency list: task_id → successors
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut all_ids: BTreeSet<&str> = BTreeSet::new();

    for task in &project.tasks {
        all_ids.insert(&task.id);
        for pred in &task.predecessors {
            adj.entry(pred.as_str()).or_default().push(task.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for &node in &all_ids {
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular dependency detected involving task '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
