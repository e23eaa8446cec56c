//! Ferry block-time estimation.
//!
//! Converts a great-circle distance into scheduled minutes for a fleet
//! class: cruise time at the class's true airspeed, a per-class climb and
//! descent allowance, and a fixed taxi allowance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::geo::distance_nm;
use crate::models::{normalize_fleet_class, CLASS_CJ, CLASS_LEG};

/// Extra track flown over the great circle (airways, vectors).
pub const ROUTE_FACTOR: f64 = 1.07;
/// Taxi-out plus taxi-in allowance (minutes).
pub const TAXI_MIN: i64 = 10;
/// Ferry minutes used when an airport is blank or unknown.
pub const UNKNOWN_REPOSITION_MIN: i64 = 999;

/// Cruise performance of a fleet class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetPerformance {
    /// True airspeed in knots.
    pub cruise_tas_kt: f64,
    /// Climb/descent allowance in minutes.
    pub fudge_min: i64,
}

/// Looks up the performance bucket for a (possibly un-normalized) class.
///
/// Unknown classes fly with the generic (`GEN`) profile.
pub fn performance_for(fleet_class: &str) -> FleetPerformance {
    match normalize_fleet_class(fleet_class).as_str() {
        CLASS_CJ => FleetPerformance {
            cruise_tas_kt: 390.0,
            fudge_min: 12,
        },
        CLASS_LEG => FleetPerformance {
            cruise_tas_kt: 450.0,
            fudge_min: 15,
        },
        _ => FleetPerformance {
            cruise_tas_kt: 410.0,
            fudge_min: 13,
        },
    }
}

/// Block minutes for a distance, rounded up to the next whole minute.
pub fn block_minutes(nm: f64, fleet_class: &str) -> i64 {
    let perf = performance_for(fleet_class);
    let block = nm / perf.cruise_tas_kt * 60.0 + (perf.fudge_min + TAXI_MIN) as f64;
    block.ceil() as i64
}

/// Coordinates of one airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub lat: f64,
    pub lon: f64,
    /// IANA time zone, informational only.
    #[serde(default)]
    pub tz: Option<String>,
}

impl Airport {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, tz: None }
    }
}

/// Read-only airport lookup keyed by upper-case code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirportTable {
    airports: HashMap<String, Airport>,
}

impl AirportTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an airport; the code is upper-cased.
    pub fn insert(&mut self, code: &str, airport: Airport) {
        self.airports.insert(code.trim().to_uppercase(), airport);
    }

    /// Builder: adds an airport by coordinates.
    pub fn with_airport(mut self, code: &str, lat: f64, lon: f64) -> Self {
        self.insert(code, Airport::new(lat, lon));
        self
    }

    /// Looks up an airport (case-insensitive).
    pub fn get(&self, code: &str) -> Option<&Airport> {
        self.airports.get(&code.trim().to_uppercase())
    }

    /// Whether the code is known.
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Number of airports.
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Airport)> for AirportTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, Airport)>>(iter: I) -> Self {
        let mut table = AirportTable::new();
        for (code, airport) in iter {
            table.insert(code, airport);
        }
        table
    }
}

/// Ferry minutes between two airports for a fleet class.
///
/// Identical airports cost nothing. A blank or unknown code returns
/// [`UNKNOWN_REPOSITION_MIN`] so the pairing stays expensive instead of
/// failing the solve.
pub fn repo_minutes_between(
    icao_from: &str,
    icao_to: &str,
    fleet_class: &str,
    airports: &AirportTable,
) -> i64 {
    let from = icao_from.trim().to_uppercase();
    let to = icao_to.trim().to_uppercase();
    if from.is_empty() || to.is_empty() {
        return UNKNOWN_REPOSITION_MIN;
    }
    if from == to {
        return 0;
    }

    match (airports.get(&from), airports.get(&to)) {
        (Some(a), Some(b)) => {
            let nm = distance_nm(a.lat, a.lon, b.lat, b.lon) * ROUTE_FACTOR;
            block_minutes(nm, fleet_class)
        }
        _ => {
            tracing::warn!(from = %from, to = %to, "missing airport coordinates, using sentinel");
            UNKNOWN_REPOSITION_MIN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AirportTable {
        AirportTable::new()
            .with_airport("CYBW", 51.1031, -114.374)
            .with_airport("cyvr", 49.1939, -123.183)
    }

    #[test]
    fn test_block_minutes_zero_distance() {
        assert_eq!(block_minutes(0.0, "CJ"), 22);
        assert_eq!(block_minutes(0.0, "LEG"), 25);
        assert_eq!(block_minutes(0.0, "GEN"), 23);
        assert_eq!(block_minutes(0.0, "PC12"), 23);
    }

    #[test]
    fn test_block_minutes_rounds_up() {
        // 390 NM at 390 kt is exactly 60 minutes.
        assert_eq!(block_minutes(390.0, "CJ"), 82);
        assert_eq!(block_minutes(390.1, "CJ"), 83);
    }

    #[test]
    fn test_class_variants_share_bucket() {
        assert_eq!(performance_for("cj4"), performance_for("CJ"));
        assert_eq!(performance_for("E545"), performance_for("LEG"));
    }

    #[test]
    fn test_repo_same_airport() {
        assert_eq!(repo_minutes_between("CYBW", "cybw", "CJ", &table()), 0);
    }

    #[test]
    fn test_repo_unknown_airport() {
        assert_eq!(
            repo_minutes_between("CYBW", "ZZZZ", "CJ", &table()),
            UNKNOWN_REPOSITION_MIN
        );
        assert_eq!(
            repo_minutes_between("", "CYBW", "CJ", &table()),
            UNKNOWN_REPOSITION_MIN
        );
    }

    #[test]
    fn test_repo_applies_route_factor() {
        let t = table();
        let a = t.get("CYBW").unwrap();
        let b = t.get("CYVR").unwrap();
        let expected = block_minutes(distance_nm(a.lat, a.lon, b.lat, b.lon) * ROUTE_FACTOR, "CJ");
        assert_eq!(repo_minutes_between("CYBW", "CYVR", "CJ", &t), expected);
        // ~382 NM at 390 kt plus 22 minutes of overhead.
        assert!((75..=85).contains(&expected), "got {expected}");
    }

    #[test]
    fn test_table_from_iter() {
        let t: AirportTable = [("kden", Airport::new(39.8617, -104.673))]
            .into_iter()
            .collect();
        assert!(t.contains("KDEN"));
        assert_eq!(t.len(), 1);
    }
}
