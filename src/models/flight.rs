//! Flight (leg) model.
//!
//! A flight is one leg to be placed on a tail. Its block time is fixed;
//! only the departure may move, inside a base window widened by negotiated
//! shift bands.
//!
//! # Time Representation
//! All times are whole minutes relative to the horizon start (t=0).
//! The caller defines what t=0 means (e.g. 08Z on the schedule day).

use serde::{Deserialize, Serialize};

use super::fleet::normalize_fleet_class;
use crate::error::ConfigurationError;

/// Default negotiated band after the window (minutes).
pub const DEFAULT_SHIFT_PLUS_CAP: i64 = 90;
/// Default negotiated band before the window (minutes).
pub const DEFAULT_SHIFT_MINUS_CAP: i64 = 30;

/// Purpose of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightIntent {
    /// Revenue leg carrying passengers.
    Pax,
    /// Empty positioning leg planned by operations.
    Pos,
}

impl FlightIntent {
    /// Parses an intent label; anything other than `PAX` is positioning.
    pub fn parse(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("PAX") {
            FlightIntent::Pax
        } else {
            FlightIntent::Pos
        }
    }
}

/// A flight leg to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Unique flight identifier.
    pub id: String,
    /// Departure airport code (upper-case).
    pub origin: String,
    /// Arrival airport code (upper-case).
    pub dest: String,
    /// Block time in minutes.
    pub duration_min: i64,
    /// Normalized fleet-class bucket.
    pub fleet_class: String,
    /// Owner (customer) identifier.
    pub owner_id: String,
    /// Base window lower bound.
    pub earliest_etd_min: i64,
    /// Base window upper bound.
    pub latest_etd_min: i64,
    /// Departure the owner asked for.
    pub preferred_etd_min: i64,
    /// Negotiated band after `latest_etd_min`.
    pub shift_plus_cap: i64,
    /// Negotiated band before `earliest_etd_min`.
    pub shift_minus_cap: i64,
    /// Cheap (flex) band after the window. `None` = same as `shift_plus_cap`.
    pub original_shift_plus_cap: Option<i64>,
    /// Cheap (flex) band before the window. `None` = same as `shift_minus_cap`.
    pub original_shift_minus_cap: Option<i64>,
    /// Per-minute shift rate overriding the policy default.
    pub shift_cost_per_min: Option<i64>,
    /// Tail currently slated to fly this leg.
    pub current_tail_id: Option<String>,
    /// Whether the leg may move off `current_tail_id`.
    pub allow_tail_swap: bool,
    /// Whether the leg may be sold to an outside operator.
    pub allow_outsource: bool,
    /// Revenue or positioning.
    pub intent: FlightIntent,
    /// Whether the leg must be covered (PAX legs always are by default).
    pub must_cover: bool,
}

impl Flight {
    /// Creates a flight with a zero-width window at t=0 and default bands.
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        dest: impl Into<String>,
        duration_min: i64,
        fleet_class: &str,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into().trim().to_uppercase(),
            dest: dest.into().trim().to_uppercase(),
            duration_min,
            fleet_class: normalize_fleet_class(fleet_class),
            owner_id: owner_id.into(),
            earliest_etd_min: 0,
            latest_etd_min: 0,
            preferred_etd_min: 0,
            shift_plus_cap: DEFAULT_SHIFT_PLUS_CAP,
            shift_minus_cap: DEFAULT_SHIFT_MINUS_CAP,
            original_shift_plus_cap: None,
            original_shift_minus_cap: None,
            shift_cost_per_min: None,
            current_tail_id: None,
            allow_tail_swap: true,
            allow_outsource: true,
            intent: FlightIntent::Pax,
            must_cover: true,
        }
    }

    /// Sets the base window and preferred departure.
    pub fn with_window(mut self, earliest: i64, latest: i64, preferred: i64) -> Self {
        self.earliest_etd_min = earliest;
        self.latest_etd_min = latest;
        self.preferred_etd_min = preferred;
        self
    }

    /// Pins the leg to a single departure minute.
    pub fn at(self, etd_min: i64) -> Self {
        self.with_window(etd_min, etd_min, etd_min)
    }

    /// Sets the negotiated shift bands.
    pub fn with_shift_caps(mut self, plus: i64, minus: i64) -> Self {
        self.shift_plus_cap = plus;
        self.shift_minus_cap = minus;
        self
    }

    /// Sets the cheap flex bands.
    pub fn with_original_caps(mut self, plus: i64, minus: i64) -> Self {
        self.original_shift_plus_cap = Some(plus);
        self.original_shift_minus_cap = Some(minus);
        self
    }

    /// Overrides the policy's per-minute shift rate.
    pub fn with_shift_cost(mut self, cost_per_min: i64) -> Self {
        self.shift_cost_per_min = Some(cost_per_min);
        self
    }

    /// Sets the currently slated tail.
    pub fn with_current_tail(mut self, tail_id: impl Into<String>) -> Self {
        self.current_tail_id = Some(tail_id.into());
        self
    }

    /// Allows or forbids moving the leg off its current tail.
    pub fn with_tail_swap(mut self, allow: bool) -> Self {
        self.allow_tail_swap = allow;
        self
    }

    /// Allows or forbids outsourcing.
    pub fn with_outsource(mut self, allow: bool) -> Self {
        self.allow_outsource = allow;
        self
    }

    /// Sets the intent; positioning legs become optional.
    pub fn with_intent(mut self, intent: FlightIntent) -> Self {
        self.intent = intent;
        self.must_cover = intent == FlightIntent::Pax;
        self
    }

    /// Overrides whether the leg must be covered.
    pub fn with_must_cover(mut self, must_cover: bool) -> Self {
        self.must_cover = must_cover;
        self
    }

    /// Flex boundary after the window.
    pub fn flex_plus_cap(&self) -> i64 {
        self.original_shift_plus_cap.unwrap_or(self.shift_plus_cap)
    }

    /// Flex boundary before the window.
    pub fn flex_minus_cap(&self) -> i64 {
        self.original_shift_minus_cap.unwrap_or(self.shift_minus_cap)
    }

    /// Whether the leg may be dropped as a positioning skip.
    pub fn is_skippable(&self) -> bool {
        self.intent == FlightIntent::Pos && !self.must_cover
    }

    /// Returns a copy with normalized codes and fleet class.
    ///
    /// Deserialized flights bypass [`Flight::new`], so ingestion always
    /// goes through this.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.origin = copy.origin.trim().to_uppercase();
        copy.dest = copy.dest.trim().to_uppercase();
        copy.fleet_class = normalize_fleet_class(&copy.fleet_class);
        copy
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut non_negative = vec![
            ("duration_min", self.duration_min),
            ("earliest_etd_min", self.earliest_etd_min),
            ("latest_etd_min", self.latest_etd_min),
            ("preferred_etd_min", self.preferred_etd_min),
            ("shift_plus_cap", self.shift_plus_cap),
            ("shift_minus_cap", self.shift_minus_cap),
        ];
        if let Some(v) = self.original_shift_plus_cap {
            non_negative.push(("original_shift_plus_cap", v));
        }
        if let Some(v) = self.original_shift_minus_cap {
            non_negative.push(("original_shift_minus_cap", v));
        }
        if let Some(v) = self.shift_cost_per_min {
            non_negative.push(("shift_cost_per_min", v));
        }

        for (field, value) in non_negative {
            if value < 0 {
                return Err(ConfigurationError::Negative {
                    entity: "flight",
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        if self.earliest_etd_min > self.latest_etd_min {
            return Err(ConfigurationError::InvertedWindow {
                entity: "flight",
                id: self.id.clone(),
                lower_field: "earliest_etd_min",
                lower: self.earliest_etd_min,
                upper_field: "latest_etd_min",
                upper: self.latest_etd_min,
            });
        }

        Ok(())
    }

    /// Checks that the window lies inside `[0, horizon_min]`.
    pub fn check_horizon(&self, horizon_min: i64) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("earliest_etd_min", self.earliest_etd_min),
            ("latest_etd_min", self.latest_etd_min),
            ("preferred_etd_min", self.preferred_etd_min),
        ] {
            if value > horizon_min {
                return Err(ConfigurationError::BeyondHorizon {
                    entity: "flight",
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
    fn test_flight_builder() {
        let f = Flight::new("F1", "cybw", "CYVR ", 150, "cj3", "O100")
            .with_window(420, 480, 435)
            .with_shift_caps(60, 15)
            .with_original_caps(20, 10)
            .with_shift_cost(4)
            .with_current_tail("C-GCJ1")
            .with_outsource(false);

        assert_eq!(f.origin, "CYBW");
        assert_eq!(f.dest, "CYVR");
        assert_eq!(f.fleet_class, "CJ");
        assert_eq!(f.earliest_etd_min, 420);
        assert_eq!(f.latest_etd_min, 480);
        assert_eq!(f.preferred_etd_min, 435);
        assert_eq!(f.flex_plus_cap(), 20);
        assert_eq!(f.flex_minus_cap(), 10);
        assert_eq!(f.shift_cost_per_min, Some(4));
        assert_eq!(f.current_tail_id.as_deref(), Some("C-GCJ1"));
        assert!(!f.allow_outsource);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_window_beyond_horizon() {
        let f = Flight::new("F1", "A", "B", 60, "CJ", "O").at(400_000_000);
        assert!(f.validate().is_ok());
        assert!(matches!(
            f.check_horizon(1440),
            Err(ConfigurationError::BeyondHorizon {
                field: "earliest_etd_min",
                value: 400_000_000,
                ..
            })
        ));

        let f = Flight::new("F2", "A", "B", 60, "CJ", "O").with_window(1400, 1440, 1500);
        assert!(matches!(
            f.check_horizon(1440),
            Err(ConfigurationError::BeyondHorizon {
                field: "preferred_etd_min",
                ..
            })
        ));
        assert!(f.check_horizon(1500).is_ok());
    }

    #[test]
    fn test_flex_caps_default_to_negotiated() {
        let f = Flight::new("F1", "A", "B", 60, "CJ", "O").with_shift_caps(45, 5);
        assert_eq!(f.flex_plus_cap(), 45);
        assert_eq!(f.flex_minus_cap(), 5);
    }

    #[test]
    fn test_positioning_intent() {
        let f = Flight::new("P1", "A", "B", 60, "CJ", "OPS").with_intent(FlightIntent::Pos);
        assert!(!f.must_cover);
        assert!(f.is_skippable());

        let pinned = f.with_must_cover(true);
        assert!(!pinned.is_skippable());

        assert_eq!(FlightIntent::parse("pax"), FlightIntent::Pax);
        assert_eq!(FlightIntent::parse("ferry"), FlightIntent::Pos);
    }

    #[test]
    fn test_rejects_inverted_window() {
        let f = Flight::new("F1", "A", "B", 60, "CJ", "O").with_window(500, 400, 450);
        assert!(matches!(
            f.validate(),
            Err(ConfigurationError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_fields() {
        let f = Flight::new("F1", "A", "B", -5, "CJ", "O");
        assert!(matches!(
            f.validate(),
            Err(ConfigurationError::Negative { field: "duration_min", .. })
        ));

        let f = Flight::new("F1", "A", "B", 60, "CJ", "O").with_shift_caps(10, -1);
        assert!(matches!(
            f.validate(),
            Err(ConfigurationError::Negative { field: "shift_minus_cap", .. })
        ));
    }

    #[test]
    fn test_normalized_copy() {
        let mut raw = Flight::new("F1", "A", "B", 60, "CJ", "O");
        raw.fleet_class = "e545".into();
        raw.origin = " kden".into();
        let norm = raw.normalized();
        assert_eq!(norm.fleet_class, "LEG");
        assert_eq!(norm.origin, "KDEN");
        assert_eq!(raw.fleet_class, "e545");
    }

    #[test]
    fn test_serde_roundtrip() {
        let f = Flight::new("F1", "CYBW", "CYVR", 150, "CJ", "O100").at(480);
        let json = serde_json::to_string(&f).unwrap();
        let back: Flight = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
