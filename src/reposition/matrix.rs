//! Reposition matrices.
//!
//! Caller-owned value objects holding ferry minutes, indexed by position in
//! the flight and tail lists handed to the scheduler. There is no hidden
//! cache: build them once per request and pass them in.

use serde::{Deserialize, Serialize};

use super::block::{repo_minutes_between, AirportTable, UNKNOWN_REPOSITION_MIN};
use crate::error::ConfigurationError;
use crate::models::{Flight, Tail};

/// Dense row-major matrix of ferry minutes.
///
/// - Flight-to-flight: `rows = cols = flights`, entry `(i, j)` is the ferry
///   from flight `i`'s destination to flight `j`'s origin.
/// - Tail-to-flight: `rows = tails`, `cols = flights`, entry `(t, j)` is the
///   ferry from tail `t`'s last position to flight `j`'s origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionMatrix {
    rows: usize,
    cols: usize,
    minutes: Vec<i64>,
}

impl RepositionMatrix {
    /// An all-zero matrix (no ferry anywhere).
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            minutes: vec![0; rows * cols],
        }
    }

    /// Builds a matrix from possibly ragged rows.
    ///
    /// Provided entries are kept; missing rows and columns are padded with
    /// 0 and surplus entries are ignored. Negative minutes are rejected.
    pub fn from_rows(
        data: &[Vec<i64>],
        rows: usize,
        cols: usize,
    ) -> Result<Self, ConfigurationError> {
        let mut matrix = Self::zeros(rows, cols);
        for (r, row) in data.iter().take(rows).enumerate() {
            for (c, &value) in row.iter().take(cols).enumerate() {
                if value < 0 {
                    return Err(ConfigurationError::NegativeReposition {
                        row: r,
                        col: c,
                        value,
                    });
                }
                matrix.set(r, c, value);
            }
        }
        Ok(matrix)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Ferry minutes at `(row, col)`; 0 outside the matrix.
    pub fn get(&self, row: usize, col: usize) -> i64 {
        if row < self.rows && col < self.cols {
            self.minutes[row * self.cols + col]
        } else {
            0
        }
    }

    /// Overwrites one entry. Out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, minutes: i64) {
        if row < self.rows && col < self.cols {
            self.minutes[row * self.cols + col] = minutes;
        }
    }

    /// Returns a copy resized to `rows x cols`, padding with 0.
    pub fn resized(&self, rows: usize, cols: usize) -> Self {
        let mut out = Self::zeros(rows, cols);
        for r in 0..rows.min(self.rows) {
            for c in 0..cols.min(self.cols) {
                out.set(r, c, self.get(r, c));
            }
        }
        out
    }

    /// Number of entries holding the unknown-airport sentinel.
    pub fn sentinel_count(&self) -> usize {
        self.minutes
            .iter()
            .filter(|&&m| m == UNKNOWN_REPOSITION_MIN)
            .count()
    }
}

/// Ferry minutes for chaining every ordered pair of flights.
///
/// Uses the class of the leg the tail arrives on; the diagonal is 0.
///
/// The matrix does not depend on which tail flies the pair, so a LEG tail
/// flying CJ legs under a class upgrade ferries at the CJ estimate. Past
/// roughly 150 nm that figure is the longer of the two; below it the LEG
/// estimate exceeds it by at most its extra 3 minutes of fudge.
pub fn build_reposition_matrix(flights: &[Flight], airports: &AirportTable) -> RepositionMatrix {
    let n = flights.len();
    let mut matrix = RepositionMatrix::zeros(n, n);
    for (i, from) in flights.iter().enumerate() {
        for (j, to) in flights.iter().enumerate() {
            if i != j {
                let minutes = repo_minutes_between(&from.dest, &to.origin, &from.fleet_class, airports);
                matrix.set(i, j, minutes);
            }
        }
    }
    matrix
}

/// Ferry minutes from each tail's last position to each flight's origin.
///
/// Tails without a known position get a zero row.
pub fn build_initial_reposition_matrix(
    tails: &[Tail],
    flights: &[Flight],
    airports: &AirportTable,
) -> RepositionMatrix {
    let mut matrix = RepositionMatrix::zeros(tails.len(), flights.len());
    for (t, tail) in tails.iter().enumerate() {
        let Some(position) = tail.last_position_airport.as_deref() else {
            continue;
        };
        if position.trim().is_empty() {
            continue;
        }
        for (j, flight) in flights.iter().enumerate() {
            let minutes = repo_minutes_between(position, &flight.origin, &tail.fleet_class, airports);
            matrix.set(t, j, minutes);
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airports() -> AirportTable {
        AirportTable::new()
            .with_airport("CYBW", 51.1031, -114.374)
            .with_airport("CYVR", 49.1939, -123.183)
            .with_airport("CYEG", 53.3097, -113.58)
    }

    fn flights() -> Vec<Flight> {
        vec![
            Flight::new("F1", "CYBW", "CYVR", 90, "CJ", "A").at(480),
            Flight::new("F2", "CYEG", "CYBW", 90, "CJ", "B").at(540),
            Flight::new("F3", "CYVR", "XXXX", 60, "CJ", "C").at(700),
        ]
    }

    #[test]
    fn test_flight_matrix() {
        let fl = flights();
        let m = build_reposition_matrix(&fl, &airports());
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 3);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 0);
        }
        // F1 lands at CYVR, F3 departs CYVR.
        assert_eq!(m.get(0, 2), 0);
        // F1 lands at CYVR, F2 departs CYEG.
        assert_eq!(
            m.get(0, 1),
            repo_minutes_between("CYVR", "CYEG", "CJ", &airports())
        );
        // F3 lands at an unknown airport.
        assert_eq!(m.get(2, 0), UNKNOWN_REPOSITION_MIN);
        assert_eq!(m.sentinel_count(), 2);
    }

    #[test]
    fn test_ferry_priced_with_leg_class() {
        // F1 is a CJ leg; a LEG tail on upgrade gets the same CJ figure.
        let m = build_reposition_matrix(&flights(), &airports());
        let cj = repo_minutes_between("CYVR", "CYEG", "CJ", &airports());
        let leg = repo_minutes_between("CYVR", "CYEG", "LEG", &airports());
        assert_eq!(m.get(0, 1), cj);
        assert!(cj >= leg);
    }

    #[test]
    fn test_initial_matrix() {
        let tails = vec![
            Tail::new("T1", "CJ").with_last_position("CYVR", 0),
            Tail::new("T2", "CJ"),
        ];
        let m = build_initial_reposition_matrix(&tails, &flights(), &airports());
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(0, 2), 0);
        assert!(m.get(0, 0) > 0);
        assert_eq!(m.get(1, 0), 0);
        assert_eq!(m.get(1, 1), 0);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let m = RepositionMatrix::from_rows(&[vec![0, 42]], 2, 2).unwrap();
        assert_eq!(m.get(0, 1), 42);
        assert_eq!(m.get(1, 0), 0);
        assert_eq!(m.get(1, 1), 0);

        let m = RepositionMatrix::from_rows(&[vec![0, 5, 7], vec![3]], 1, 2).unwrap();
        assert_eq!(m.rows(), 1);
        assert_eq!(m.get(0, 1), 5);
    }

    #[test]
    fn test_negative_entry_rejected() {
        let err = RepositionMatrix::from_rows(&[vec![0, -3]], 2, 2).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NegativeReposition {
                row: 0,
                col: 1,
                value: -3
            }
        );
    }

    #[test]
    fn test_resized_keeps_overlap() {
        let mut m = RepositionMatrix::zeros(2, 2);
        m.set(1, 0, 17);
        let r = m.resized(3, 1);
        assert_eq!(r.get(1, 0), 17);
        assert_eq!(r.get(2, 0), 0);
        assert_eq!(r.cols(), 1);
    }
}
