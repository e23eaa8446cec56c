//! Scheduling domain models.
//!
//! Plain value records for the tail-assignment problem and its answers.
//! Entities are copied and normalized on ingestion; nothing here does I/O.
//!
//! # Domain Mappings
//!
//! | fleet-schedule | Scheduling theory | Constraint model |
//! |----------------|-------------------|------------------|
//! | Flight | Job with a soft release window | Alternative over optional intervals |
//! | Tail | Unary machine with availability | Sequence (no-overlap) |
//! | Reposition | Sequence-dependent setup | Transition table |
//! | LeverPolicy | Cost function weights | Objective coefficients |

mod fleet;
mod flight;
mod policy;
mod solution;
mod tail;

pub use fleet::{
    class_fit, normalize_fleet_class, ClassFit, CLASS_CJ, CLASS_LEG,
};
pub use flight::{Flight, FlightIntent, DEFAULT_SHIFT_MINUS_CAP, DEFAULT_SHIFT_PLUS_CAP};
pub use policy::{LeverPolicy, MAX_HORIZON_MIN};
pub use solution::{
    AssignedFlight, CostBreakdown, OutsourcedFlight, RepositionLeg, ReschedulingSolution,
    SolveStatus, UnassignedFlight, UnassignedReason,
};
pub use tail::Tail;
