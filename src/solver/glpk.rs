//! External MILP backend driving the GLPK `glpsol` executable.
//!
//! The model is written in CPLEX LP format to a temporary directory and
//! solved with `glpsol --lp model.lp -w solution.txt [--tmlim s]`. The
//! raw MIP solution file has the shape:
//!
//! ```text
//! c comment lines
//! s mip ROWS COLS STAT OBJ
//! i ROW VALUE
//! j COL VALUE
//! e o f
//! ```
//!
//! where `STAT` is `o` (optimal), `f` (feasible), `n` (no integer
//! feasible solution) or `u` (undefined).

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{LinearSolution, LinearSolver, SearchStats, SolveStatus, SolverConfig};
use crate::error::{Result, ScheduleError};
use crate::formulation::LinearModel;

/// Extra wall-clock time granted past the time limit before the process
/// is killed.
const DEFAULT_GRACE: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// GLPK command-line backend.
#[derive(Debug, Clone)]
pub struct GlpkSolver {
    binary: PathBuf,
    grace: Duration,
}

impl Default for GlpkSolver {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("glpsol"),
            grace: DEFAULT_GRACE,
        }
    }
}

impl GlpkSolver {
    /// Uses `glpsol` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the grace period past the time limit.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn unavailable(&self, what: impl std::fmt::Display) -> ScheduleError {
        ScheduleError::solver_unavailable(format!("{}: {what}", self.binary.display()))
    }
}

impl LinearSolver for GlpkSolver {
    fn name(&self) -> &str {
        "glpk"
    }

    fn solve(&self, model: &LinearModel, config: &SolverConfig) -> Result<LinearSolution> {
        let started = Instant::now();
        let dir = tempfile::tempdir().map_err(|e| self.unavailable(format!("temp dir: {e}")))?;
        let lp_path = dir.path().join("model.lp");
        let out_path = dir.path().join("solution.txt");
        fs::write(&lp_path, model.to_cplex_lp())
            .map_err(|e| self.unavailable(format!("writing model: {e}")))?;

        let mut command = Command::new(&self.binary);
        command
            .arg("--lp")
            .arg(&lp_path)
            .arg("-w")
            .arg(&out_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(limit) = config.time_limit() {
            command.arg("--tmlim").arg(limit.as_secs().max(1).to_string());
        }

        info!(
            variables = model.variable_count(),
            constraints = model.constraint_count(),
            "starting glpsol"
        );
        let mut child = command.spawn().map_err(|e| self.unavailable(e))?;
        let kill_at = config.deadline_from(started).map(|d| d + self.grace);

        let exit = loop {
            match child.try_wait() {
                Ok(Some(exit)) => break exit,
                Ok(None) => {}
                Err(e) => return Err(self.unavailable(e)),
            }
            if kill_at.is_some_and(|t| Instant::now() >= t) {
                warn!("glpsol ran past its time limit, killing it");
                let _ = child.kill();
                let _ = child.wait();
                let stats = SearchStats {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    ..Default::default()
                };
                return Ok(LinearSolution::without_assignment(SolveStatus::TimedOut, stats));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !exit.success() {
            warn!(%exit, "glpsol failed");
            return Err(self.unavailable(format!("exited with {exit}")));
        }

        let text = fs::read_to_string(&out_path).map_err(|e| {
            ScheduleError::corrupt_solution(format!("reading glpsol output: {e}"))
        })?;
        let mut solution =
            parse_raw_solution(&text, model.variable_count(), config.time_limit_ms.is_some())?;
        solution.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(status = ?solution.status, objective = ?solution.objective, "glpsol finished");
        Ok(solution)
    }
}

/// Parses a GLPK raw MIP solution with `columns` columns.
///
/// Status `f` (integer feasible, not proven) is reported as `TimedOut`
/// when a time limit was in force and `Feasible` otherwise.
///
/// # Errors
/// `CorruptSolution` if the status line is missing or malformed, the
/// column count differs, or a solution status lacks column values.
pub fn parse_raw_solution(text: &str, columns: usize, time_limited: bool) -> Result<LinearSolution> {
    let mut status_line: Option<(char, f64)> = None;
    let mut values: Vec<Option<f64>> = vec![None; columns];

    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let bad = |what: &str| {
            ScheduleError::corrupt_solution(format!("line {}: {what}: {line:?}", lineno + 1))
        };
        match fields.first().copied() {
            Some("s") => {
                let [_, kind, _rows, cols, stat, obj] = fields[..] else {
                    return Err(bad("malformed status line"));
                };
                if kind != "mip" {
                    return Err(bad("not a MIP solution"));
                }
                let cols: usize = cols.parse().map_err(|_| bad("column count"))?;
                if cols != columns {
                    return Err(bad(&format!("expected {columns} columns")));
                }
                let stat = stat.chars().next().ok_or_else(|| bad("status"))?;
                let obj: f64 = obj.parse().map_err(|_| bad("objective"))?;
                status_line = Some((stat, obj));
            }
            Some("j") => {
                let [_, col, value] = fields[..] else {
                    return Err(bad("malformed column line"));
                };
                let col: usize = col.parse().map_err(|_| bad("column index"))?;
                let value: f64 = value.parse().map_err(|_| bad("column value"))?;
                let slot = col
                    .checked_sub(1)
                    .and_then(|i| values.get_mut(i))
                    .ok_or_else(|| bad("column index out of range"))?;
                *slot = Some(value);
            }
            _ => {}
        }
    }

    let Some((stat, objective)) = status_line else {
        return Err(ScheduleError::corrupt_solution("no status line in glpsol output"));
    };

    let status = match stat {
        'o' => SolveStatus::Optimal,
        'f' if time_limited => SolveStatus::TimedOut,
        'f' => SolveStatus::Feasible,
        'n' => SolveStatus::Infeasible,
        'u' => SolveStatus::TimedOut,
        other => {
            return Err(ScheduleError::corrupt_solution(format!(
                "unknown solution status '{other}'"
            )))
        }
    };

    if !matches!(stat, 'o' | 'f') {
        return Ok(LinearSolution::without_assignment(status, SearchStats::default()));
    }

    let values = values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| ScheduleError::corrupt_solution(format!("no value for column {}", i + 1)))
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(LinearSolution {
        status,
        values: Some(values),
        objective: Some(objective),
        stats: SearchStats::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::diamond_project;
    use crate::formulation::ModelBuilder;
    use crate::scheduler::ProjectScheduler;
    use std::path::Path;

    const OPTIMAL: &str = "\
c Problem:
c Rows:       2
c Columns:    3
s mip 2 3 o 7
i 1 3
i 2 7
j 1 0
j 2 1
j 3 7
e o f
";

    #[test]
    fn test_parse_optimal() {
        let solution = parse_raw_solution(OPTIMAL, 3, false).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, Some(7.0));
        assert_eq!(solution.values, Some(vec![0.0, 1.0, 7.0]));
    }

    #[test]
    fn test_parse_feasible_status_depends_on_time_limit() {
        let text = OPTIMAL.replace("s mip 2 3 o 7", "s mip 2 3 f 7");
        let free = parse_raw_solution(&text, 3, false).unwrap();
        assert_eq!(free.status, SolveStatus::Feasible);
        let limited = parse_raw_solution(&text, 3, true).unwrap();
        assert_eq!(limited.status, SolveStatus::TimedOut);
        assert!(limited.has_assignment());
    }

    #[test]
    fn test_parse_infeasible() {
        let solution = parse_raw_solution("s mip 2 3 n 0\ne o f\n", 3, false).unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(!solution.has_assignment());
    }

    #[test]
    fn test_parse_corrupt() {
        assert!(matches!(
            parse_raw_solution("c nothing here\n", 3, false),
            Err(ScheduleError::CorruptSolution(_))
        ));
        // column count mismatch
        assert!(parse_raw_solution(OPTIMAL, 4, false).is_err());
        // missing column value
        let text = OPTIMAL.replace("j 3 7\n", "");
        assert!(parse_raw_solution(&text, 3, false).is_err());
        // out-of-range column
        let text = OPTIMAL.replace("j 3 7", "j 9 7");
        assert!(parse_raw_solution(&text, 3, false).is_err());
        // LP rather than MIP
        let text = OPTIMAL.replace("s mip", "s bas");
        assert!(parse_raw_solution(&text, 3, false).is_err());
    }

    // Tests that spawn processes run one at a time so no child inherits a
    // script that is still open for writing.
    static SPAWN: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    #[test]
    fn test_missing_binary_is_unavailable() {
        let _guard = SPAWN.lock();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let solver = GlpkSolver::new().with_binary("/nonexistent/glpsol");
        let err = solver.solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::SolverUnavailable(_)));
        assert_eq!(solver.name(), "glpk");
    }

    /// Writes an executable `glpsol` stand-in. Arguments arrive as
    /// `--lp MODEL -w SOLUTION [--tmlim S]`.
    #[cfg(unix)]
    fn fake_glpsol(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("glpsol");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Raw MIP output for the diamond schedule S=0, L=1, R=4, T=6.
    #[cfg(unix)]
    fn diamond_raw_solution(model: &LinearModel) -> String {
        let project = diamond_project();
        let durations: Vec<i64> = project.tasks.iter().map(|t| t.duration).collect();
        let values = model.values_from_starts(&[0, 1, 4, 6], &durations);

        let mut text = format!(
            "c fake\ns mip {} {} o 7\n",
            model.constraint_count(),
            model.variable_count()
        );
        for (i, v) in values.iter().enumerate() {
            text.push_str(&format!("j {} {v}\n", i + 1));
        }
        text.push_str("e o f");
        text
    }

    #[cfg(unix)]
    #[test]
    fn test_solves_through_process() {
        let _guard = SPAWN.lock();
        let dir = tempfile::tempdir().unwrap();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let seen = dir.path().join("seen.lp");
        let body = format!(
            "cp \"$2\" '{}'\ncat > \"$4\" <<'EOF'\n{}\nEOF",
            seen.display(),
            diamond_raw_solution(&model)
        );
        let solver = GlpkSolver::new().with_binary(fake_glpsol(dir.path(), &body));

        let solution = solver.solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, Some(7.0));
        let values = solution.values.unwrap();
        assert!(model.is_feasible(&values, 1e-6));
        assert_eq!(model.decode_starts(&values, 1e-6).unwrap(), vec![0, 1, 4, 6]);

        // Columns first appear in the objective, in VarId order.
        let lp = fs::read_to_string(&seen).unwrap();
        let objective = lp.lines().find(|l| l.starts_with(" obj:")).unwrap();
        let columns: Vec<usize> = objective
            .split_whitespace()
            .filter_map(|tok| tok.strip_prefix('x'))
            .map(|idx| idx.parse().unwrap())
            .collect();
        assert_eq!(columns, (0..model.variable_count()).collect::<Vec<_>>());
    }

    #[cfg(unix)]
    #[test]
    fn test_planner_over_process() {
        let _guard = SPAWN.lock();
        let dir = tempfile::tempdir().unwrap();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let body = format!("cat > \"$4\" <<'EOF'\n{}\nEOF", diamond_raw_solution(&model));
        let solver = GlpkSolver::new().with_binary(fake_glpsol(dir.path(), &body));

        let solution = ProjectScheduler::with_solver(solver).solve(&project).unwrap();
        assert!(solution.is_optimal());
        assert_eq!(solution.makespan, Some(7));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_killed_past_time_limit() {
        let _guard = SPAWN.lock();
        let dir = tempfile::tempdir().unwrap();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let solver = GlpkSolver::new()
            .with_binary(fake_glpsol(dir.path(), "exec sleep 10"))
            .with_grace(Duration::from_millis(50));

        let started = Instant::now();
        let config = SolverConfig::new().with_time_limit_ms(50);
        let solution = solver.solve(&model, &config).unwrap();
        assert_eq!(solution.status, SolveStatus::TimedOut);
        assert!(!solution.has_assignment());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_unavailable() {
        let _guard = SPAWN.lock();
        let dir = tempfile::tempdir().unwrap();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let solver = GlpkSolver::new().with_binary(fake_glpsol(dir.path(), "exit 1"));

        let err = solver.solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::SolverUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_is_corrupt() {
        let _guard = SPAWN.lock();
        let dir = tempfile::tempdir().unwrap();
        let project = diamond_project();
        let model = ModelBuilder::new(&project).build().unwrap();
        let solver = GlpkSolver::new().with_binary(fake_glpsol(dir.path(), "exit 0"));

        let err = solver.solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::CorruptSolution(_)));
    }
}
