//! Solver interface and solution record.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::{BoolVarId, CpModel, IntVarId, IntervalId, SequenceId};
use crate::error::ModelBuildError;

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for one solve.
    pub time_limit: Duration,
    /// Number of parallel search workers (at least one is used).
    pub workers: usize,
    /// Seed for worker diversification.
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(10),
            workers: 1,
            seed: 0,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit in (fractional) seconds. Negative values mean zero.
    pub fn with_time_limit_secs(mut self, secs: f64) -> Self {
        self.time_limit = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Outcome of a single solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpStatus {
    /// Proven best assignment.
    Optimal,
    /// Assignment found, search stopped before completing.
    Feasible,
    /// Search completed without any assignment.
    Infeasible,
    /// Search stopped before finding anything.
    Unknown,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The search tree was exhausted.
    Completed,
    /// The time limit was hit.
    TimeLimit,
}

/// Counters collected during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub nodes: u64,
    pub solutions: u64,
    pub elapsed: Duration,
    pub termination: TerminationReason,
}

impl Default for SearchStats {
    fn default() -> Self {
        Self {
            nodes: 0,
            solutions: 0,
            elapsed: Duration::ZERO,
            termination: TerminationReason::Completed,
        }
    }
}

/// Variable values of the best assignment found.
#[derive(Debug, Clone, PartialEq)]
pub struct CpSolution {
    pub status: CpStatus,
    /// Objective of the assignment; `i64::MAX` when none was found.
    pub objective: i64,
    pub bool_values: Vec<bool>,
    pub int_values: Vec<i64>,
    /// Present intervals of each sequence, in execution order.
    pub sequence_orders: Vec<Vec<IntervalId>>,
    pub stats: SearchStats,
}

impl CpSolution {
    /// A solution carrying no assignment.
    pub fn empty(status: CpStatus, stats: SearchStats) -> Self {
        Self {
            status,
            objective: i64::MAX,
            bool_values: Vec::new(),
            int_values: Vec::new(),
            sequence_orders: Vec::new(),
            stats,
        }
    }

    /// Whether an assignment is available.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, CpStatus::Optimal | CpStatus::Feasible)
    }

    /// Value of a boolean variable (`false` when absent).
    pub fn value(&self, var: BoolVarId) -> bool {
        self.bool_values.get(var.index()).copied().unwrap_or(false)
    }

    /// Value of an integer variable (`0` when absent).
    pub fn int_value(&self, var: IntVarId) -> i64 {
        self.int_values.get(var.index()).copied().unwrap_or(0)
    }

    /// Execution order on a sequence.
    pub fn order(&self, sequence: SequenceId) -> &[IntervalId] {
        self.sequence_orders
            .get(sequence.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A backend able to minimize a [`CpModel`].
pub trait ConstraintSolver {
    /// Solver name for logs.
    fn name(&self) -> &str;

    /// Minimizes the model's objective.
    ///
    /// Infeasibility and timeouts are reported through
    /// [`CpSolution::status`]; `Err` means the model itself is malformed.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Result<CpSolution, ModelBuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let c = SolverConfig::default()
            .with_time_limit_secs(2.5)
            .with_workers(4)
            .with_seed(7);
        assert_eq!(c.time_limit, Duration::from_millis(2500));
        assert_eq!(c.workers, 4);
        assert_eq!(c.seed, 7);

        let c = SolverConfig::default().with_time_limit_secs(-1.0);
        assert_eq!(c.time_limit, Duration::ZERO);
    }

    #[test]
    fn test_empty_solution() {
        let mut model = CpModel::new("t", 1);
        let b = model.new_bool_var("b");
        let v = model.new_int_var(0, 5, "v");

        let s = CpSolution::empty(CpStatus::Infeasible, SearchStats::default());
        assert!(!s.is_solution_found());
        assert_eq!(s.objective, i64::MAX);
        assert!(!s.value(b));
        assert_eq!(s.int_value(v), 0);
    }
}
