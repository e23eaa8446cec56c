//! Tail (aircraft) model.
//!
//! A tail is a unary resource: it flies one leg at a time inside its
//! operating window. Its last known position seeds the first ferry.

use serde::{Deserialize, Serialize};

use super::fleet::normalize_fleet_class;
use crate::error::ConfigurationError;

/// An aircraft that legs can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tail {
    /// Registration (unique).
    pub id: String,
    /// Normalized fleet-class bucket.
    pub fleet_class: String,
    /// Earliest departure on this tail (minutes from horizon start).
    pub available_from_min: i64,
    /// Latest arrival on this tail (minutes from horizon start).
    pub available_to_min: i64,
    /// Airport the tail sits at before its first leg.
    pub last_position_airport: Option<String>,
    /// When the tail is physically ready at `last_position_airport`.
    pub last_position_ready_min: i64,
}

impl Tail {
    /// Creates a tail available for the whole default horizon.
    pub fn new(id: impl Into<String>, fleet_class: &str) -> Self {
        Self {
            id: id.into(),
            fleet_class: normalize_fleet_class(fleet_class),
            available_from_min: 0,
            available_to_min: 24 * 60,
            last_position_airport: None,
            last_position_ready_min: 0,
        }
    }

    /// Sets the operating window.
    pub fn with_availability(mut self, from_min: i64, to_min: i64) -> Self {
        self.available_from_min = from_min;
        self.available_to_min = to_min;
        self
    }

    /// Sets the last known position.
    pub fn with_last_position(mut self, airport: impl Into<String>, ready_min: i64) -> Self {
        self.last_position_airport = Some(airport.into().trim().to_uppercase());
        self.last_position_ready_min = ready_min;
        self
    }

    /// Returns a copy with a normalized class and airport code.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.fleet_class = normalize_fleet_class(&copy.fleet_class);
        copy.last_position_airport = copy
            .last_position_airport
            .map(|a| a.trim().to_uppercase())
            .filter(|a| !a.is_empty());
        copy
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("available_from_min", self.available_from_min),
            ("available_to_min", self.available_to_min),
            ("last_position_ready_min", self.last_position_ready_min),
        ] {
            if value < 0 {
                return Err(ConfigurationError::Negative {
                    entity: "tail",
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        if self.available_from_min > self.available_to_min {
            return Err(ConfigurationError::InvertedWindow {
                entity: "tail",
                id: self.id.clone(),
                lower_field: "available_from_min",
                lower: self.available_from_min,
                upper_field: "available_to_min",
                upper: self.available_to_min,
            });
        }

        Ok(())
    }

    /// Checks that the tail becomes usable inside `[0, horizon_min]`.
    ///
    /// `available_to_min` may run past the horizon.
    pub fn check_horizon(&self, horizon_min: i64) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("available_from_min", self.available_from_min),
            ("last_position_ready_min", self.last_position_ready_min),
        ] {
            if value > horizon_min {
                return Err(ConfigurationError::BeyondHorizon {
                    entity: "tail",
                    id: self.id.clone(),
                    field,
                    value,
                    horizon: horizon_min,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_builder() {
        let t = Tail::new("C-GLEG1", "Legacy 450")
            .with_availability(360, 1320)
            .with_last_position("cyul", 300);

        assert_eq!(t.fleet_class, "LEG");
        assert_eq!(t.available_from_min, 360);
        assert_eq!(t.available_to_min, 1320);
        assert_eq!(t.last_position_airport.as_deref(), Some("CYUL"));
        assert_eq!(t.last_position_ready_min, 300);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_availability() {
        let t = Tail::new("T1", "CJ").with_availability(600, 500);
        assert!(matches!(
            t.validate(),
            Err(ConfigurationError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn test_availability_beyond_horizon() {
        let t = Tail::new("T1", "CJ").with_availability(2_000, 3_000);
        assert!(matches!(
            t.check_horizon(1440),
            Err(ConfigurationError::BeyondHorizon {
                field: "available_from_min",
                ..
            })
        ));
        assert!(Tail::new("T2", "CJ")
            .with_availability(0, 5_000)
            .check_horizon(1440)
            .is_ok());
    }

    #[test]
    fn test_normalized_drops_blank_position() {
        let mut t = Tail::new("T1", "CJ");
        t.last_position_airport = Some("  ".into());
        t.fleet_class = "cj2".into();
        let n = t.normalized();
        assert_eq!(n.last_position_airport, None);
        assert_eq!(n.fleet_class, "CJ");
    }
}
