//! Negotiation-aware flight-to-tail scheduling.
//!
//! Assigns charter legs to aircraft tails, trading owner departure shifts,
//! ferry legs, tail swaps, class upgrades and outsourcing against each
//! other, and returns several ranked alternatives for dispatch to
//! negotiate with.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Flight`, `Tail`, `LeverPolicy`,
//!   `ReschedulingSolution`
//! - **`reposition`**: Ferry-time estimation from airport coordinates
//! - **`cp`**: Constraint model vocabulary and the branch-and-bound backend
//! - **`scheduler`**: Model building, the solve/re-solve driver and the
//!   lever catalogue
//! - **`validation`**: Input integrity checks (duplicate IDs, blank
//!   classes, unknown current tails)
//! - **`error`**: Configuration and model-build errors
//!
//! # Time Representation
//!
//! All times are whole minutes from the start of the planning horizon.
//!
//! # Example
//!
//! ```
//! use fleet_schedule::models::{Flight, LeverPolicy, Tail};
//! use fleet_schedule::reposition::AirportTable;
//! use fleet_schedule::NegotiationScheduler;
//!
//! let flights = vec![
//!     Flight::new("F1", "CYBW", "CYVR", 90, "CJ", "O100").with_window(420, 480, 435),
//!     Flight::new("F2", "CYVR", "CYBW", 90, "CJ", "O220").with_window(600, 660, 615),
//! ];
//! let tails = vec![Tail::new("C-GCJ1", "CJ3")];
//! let airports = AirportTable::new()
//!     .with_airport("CYBW", 51.1031, -114.374)
//!     .with_airport("CYVR", 49.1939, -123.183);
//!
//! let scheduler = NegotiationScheduler::new(&flights, &tails, LeverPolicy::default())
//!     .unwrap()
//!     .with_airports(&airports);
//! let (status, solutions) = scheduler.solve(5.0, 1, 2).unwrap();
//! assert!(status.has_solution());
//! assert_eq!(solutions[0].assigned.len(), 2);
//! ```

pub mod cp;
pub mod error;
pub mod models;
pub mod reposition;
pub mod scheduler;
pub mod validation;

pub use error::{ConfigurationError, ModelBuildError, ScheduleError};
pub use scheduler::{lever_options, FleetModelBuilder, NegotiationScheduler};
