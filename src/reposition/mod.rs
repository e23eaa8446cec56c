//! Ferry (reposition) time estimation.
//!
//! Turns airport coordinates into the empty-leg minutes a tail needs to
//! reach its next departure. The airport table is injected by the caller;
//! a missing coordinate degrades to a large sentinel rather than an error.

mod block;
mod geo;
mod matrix;

pub use block::{
    block_minutes, performance_for, repo_minutes_between, Airport, AirportTable,
    FleetPerformance, ROUTE_FACTOR, TAXI_MIN, UNKNOWN_REPOSITION_MIN,
};
pub use geo::{distance_nm, EARTH_RADIUS_NM};
pub use matrix::{build_initial_reposition_matrix, build_reposition_matrix, RepositionMatrix};
