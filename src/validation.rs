//! Input validation for tail-assignment requests.
//!
//! Checks structural integrity of flights and tails before a model is
//! built. Errors reject the request:
//! - Duplicate IDs
//! - Blank IDs or fleet classes
//!
//! Warnings never reject the request; the scheduler logs them:
//! - A current tail that is not part of the request
//! - A current tail of the wrong fleet class
//! - A flight no tail can fly (it will resolve to a fallback)

use std::collections::HashSet;

use crate::models::{class_fit, ClassFit, Flight, Tail};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Finding category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An ID is empty or whitespace.
    BlankId,
    /// A fleet class is empty or whitespace.
    BlankFleetClass,
    /// A flight's current tail is not in the tail list.
    UnknownCurrentTail,
    /// A flight's current tail cannot fly it.
    IncompatibleCurrentTail,
    /// No tail in the request has the flight's fleet class.
    NoCompatibleTail,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the structure of a request.
///
/// Checks:
/// 1. No duplicate flight IDs
/// 2. No duplicate tail IDs
/// 3. No blank IDs or fleet classes
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(flights: &[Flight], tails: &[Tail]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut tail_ids = HashSet::new();
    for tail in tails {
        if tail.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BlankId,
                "Tail with blank ID",
            ));
        } else if !tail_ids.insert(tail.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate tail ID: {}", tail.id),
            ));
        }
        if tail.fleet_class.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BlankFleetClass,
                format!("Tail '{}' has no fleet class", tail.id),
            ));
        }
    }

    let mut flight_ids = HashSet::new();
    for flight in flights {
        if flight.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BlankId,
                "Flight with blank ID",
            ));
        } else if !flight_ids.insert(flight.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate flight ID: {}", flight.id),
            ));
        }
        if flight.fleet_class.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::BlankFleetClass,
                format!("Flight '{}' has no fleet class", flight.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collects non-fatal findings about a request.
///
/// `allow_class_upgrade` decides whether a LEG tail counts as able to fly
/// a CJ leg.
pub fn input_warnings(
    flights: &[Flight],
    tails: &[Tail],
    allow_class_upgrade: bool,
) -> Vec<ValidationError> {
    let usable = |flight: &Flight, tail: &Tail| match class_fit(&flight.fleet_class, &tail.fleet_class) {
        ClassFit::Exact => true,
        ClassFit::Upgrade => allow_class_upgrade,
        ClassFit::Incompatible => false,
    };

    let mut warnings = Vec::new();
    for flight in flights {
        if let Some(current) = flight.current_tail_id.as_deref() {
            match tails.iter().find(|t| t.id == current) {
                None => warnings.push(ValidationError::new(
                    ValidationErrorKind::UnknownCurrentTail,
                    format!(
                        "Flight '{}' is slated on tail '{}' which is not in the request",
                        flight.id, current
                    ),
                )),
                Some(tail) if !usable(flight, tail) => warnings.push(ValidationError::new(
                    ValidationErrorKind::IncompatibleCurrentTail,
                    format!(
                        "Flight '{}' ({}) is slated on tail '{}' ({})",
                        flight.id, flight.fleet_class, tail.id, tail.fleet_class
                    ),
                )),
                Some(_) => {}
            }
        }

        if !tails.iter().any(|t| usable(flight, t)) {
            warnings.push(ValidationError::new(
                ValidationErrorKind::NoCompatibleTail,
                format!(
                    "No tail can fly flight '{}' ({})",
                    flight.id, flight.fleet_class
                ),
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tails() -> Vec<Tail> {
        vec![
            Tail::new("C-GCJ1", "CJ"),
            Tail::new("C-GCJ2", "CJ"),
            Tail::new("C-GLEG1", "LEG"),
        ]
    }

    fn sample_flights() -> Vec<Flight> {
        vec![
            Flight::new("F1", "CYBW", "CYVR", 150, "CJ", "O100")
                .at(435)
                .with_current_tail("C-GCJ1"),
            Flight::new("F3", "CYVR", "CYUL", 300, "LEG", "O330").at(600),
        ]
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_flights(), &sample_tails()).is_ok());
        assert!(input_warnings(&sample_flights(), &sample_tails(), false).is_empty());
    }

    #[test]
    fn test_duplicate_flight_id() {
        let mut flights = sample_flights();
        flights.push(Flight::new("F1", "A", "B", 60, "CJ", "O").at(0));

        let errors = validate_input(&flights, &sample_tails()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("flight")));
    }

    #[test]
    fn test_duplicate_tail_id() {
        let tails = vec![Tail::new("T1", "CJ"), Tail::new("T1", "LEG")];

        let errors = validate_input(&sample_flights(), &tails).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("tail")));
    }

    #[test]
    fn test_multiple_errors() {
        let flights = vec![Flight::new(" ", "A", "B", 60, "", "O")];
        let tails = vec![Tail::new("T1", "CJ"), Tail::new("T1", "CJ")];

        let errors = validate_input(&flights, &tails).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_current_tail_warnings() {
        let flights = vec![
            Flight::new("F1", "A", "B", 60, "CJ", "O").with_current_tail("GHOST"),
            Flight::new("F2", "A", "B", 60, "LEG", "O").with_current_tail("C-GCJ1"),
        ];

        let warnings = input_warnings(&flights, &sample_tails(), false);
        let kinds: Vec<_> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ValidationErrorKind::UnknownCurrentTail,
                ValidationErrorKind::IncompatibleCurrentTail
            ]
        );
    }

    #[test]
    fn test_no_compatible_tail() {
        let flights = vec![Flight::new("F1", "A", "B", 60, "CJ", "O")];
        let tails = vec![Tail::new("L1", "LEG")];

        let warnings = input_warnings(&flights, &tails, false);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, ValidationErrorKind::NoCompatibleTail);

        // A LEG tail may fly the CJ leg once upgrades are allowed.
        assert!(input_warnings(&flights, &tails, true).is_empty());
    }
}
