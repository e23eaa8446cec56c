//! Constraint programming layer.
//!
//! A compact interval-scheduling vocabulary ([`CpModel`]) and a solver
//! seam ([`ConstraintSolver`]) with an exact branch-and-bound backend.
//!
//! # Modules
//! - **`model`**: variables, soft windows, alternatives, sequences, no-goods
//! - **`solver`**: solver trait, configuration, solution record
//! - **`search`**: [`BranchAndBoundSolver`]
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod model;
mod search;
mod solver;
mod timing;

pub use model::{
    Alternative, BoolVar, BoolVarId, CpModel, IntVar, IntVarId, IntervalId, IntervalVar, NoGood,
    NoGoodTerm, Sequence, SequenceId, SoftWindow,
};
pub use search::BranchAndBoundSolver;
pub use solver::{
    ConstraintSolver, CpSolution, CpStatus, SearchStats, SolverConfig, TerminationReason,
};
