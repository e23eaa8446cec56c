//! Tail assignment with negotiation levers.
//!
//! - [`FleetModelBuilder`] turns flights, tails and a [`LeverPolicy`] into a
//!   constraint model with one alternative per flight and one sequence per
//!   tail.
//! - [`NegotiationScheduler`] validates a request, solves it and returns up
//!   to `top_n` ranked [`ReschedulingSolution`]s.
//! - [`lever_options`] prices the standard asks dispatch can make when a
//!   flight falls back to outsourcing.
//!
//! # References
//!
//! - Grönkvist (2005), "The Tail Assignment Problem"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//!
//! [`LeverPolicy`]: crate::models::LeverPolicy
//! [`ReschedulingSolution`]: crate::models::ReschedulingSolution

mod builder;
mod driver;
mod levers;

pub use builder::{
    shift_bands, AssignVar, FleetModel, FleetModelBuilder, FleetVars, FlightVars, ShiftBands,
};
pub use driver::{NegotiationScheduler, DEFAULT_SIGNATURE_BUCKET_MIN};
pub use levers::{lever_options, LeverKind, LeverOption};
