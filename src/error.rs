//! Error types.
//!
//! Configuration problems are caller mistakes and are reported before any
//! model is built. Model build errors indicate a wiring defect inside the
//! builder. Infeasible or timed-out solves are *not* errors; they are
//! reported through [`SolveStatus`](crate::models::SolveStatus).

use thiserror::Error;

use crate::validation::ValidationError;

/// Malformed policy or entity data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{entity} '{id}': {field} must be non-negative (got {value})")]
    Negative {
        entity: &'static str,
        id: String,
        field: &'static str,
        value: i64,
    },

    #[error("{entity} '{id}': window inverted ({lower_field}={lower} > {upper_field}={upper})")]
    InvertedWindow {
        entity: &'static str,
        id: String,
        lower_field: &'static str,
        lower: i64,
        upper_field: &'static str,
        upper: i64,
    },

    #[error("policy: {field} must be non-negative (got {value})")]
    NegativePolicy { field: &'static str, value: i64 },

    #[error("policy: flex_pax_base_cap ({base}) exceeds {field} ({cap})")]
    FlexBaseExceedsCap {
        base: i64,
        field: &'static str,
        cap: i64,
    },

    #[error("{entity} '{id}': {field}={value} lies beyond the {horizon}-minute horizon")]
    BeyondHorizon {
        entity: &'static str,
        id: String,
        field: &'static str,
        value: i64,
        horizon: i64,
    },

    #[error("policy: horizon_min must be positive (got {0})")]
    NonPositiveHorizon(i64),

    #[error("policy: horizon_min {value} exceeds the {max}-minute maximum")]
    HorizonTooLong { value: i64, max: i64 },

    #[error("reposition matrix entry ({row}, {col}) is negative ({value})")]
    NegativeReposition { row: usize, col: usize, value: i64 },

    #[error("invalid input: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A constraint model was wired inconsistently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelBuildError {
    #[error("unknown {kind} variable id {index}")]
    UnknownVariable { kind: &'static str, index: usize },

    #[error("alternative '{0}' has no interval and no fallback")]
    EmptyAlternative(String),

    #[error("interval '{0}' is not covered by exactly one alternative")]
    UnboundInterval(String),

    #[error("sequence '{name}' expects a {expected}x{expected} transition table, got {actual} entries")]
    TransitionSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("variable '{name}' has an empty domain [{lb}, {ub}]")]
    EmptyDomain { name: String, lb: i64, ub: i64 },

    #[error("variable '{0}' has a negative objective coefficient")]
    NegativeCost(String),
}

/// Errors surfaced by [`NegotiationScheduler`](crate::scheduler::NegotiationScheduler).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ModelBuild(#[from] ModelBuildError),
}
