//! Rescheduling solution model.
//!
//! A solution is the entity-level view of one solver answer: which legs
//! fly on which tail and when, which legs leave the fleet, the ferry legs
//! this implies, and what it all costs.

use serde::{Deserialize, Serialize};

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Best possible schedule under the model.
    Optimal,
    /// A schedule was found but not proven best within the time budget.
    Feasible,
    /// No schedule exists under the constraints.
    Infeasible,
    /// The time budget ran out before any schedule was found.
    TimedOut,
}

impl SolveStatus {
    /// Whether solutions accompany this status.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// A leg placed on a tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedFlight {
    pub flight_id: String,
    pub tail_id: String,
    /// Tail the leg was slated for before solving.
    pub original_tail_id: Option<String>,
    /// Whether the leg moved off its original tail.
    pub tail_swapped: bool,
    /// Whether a CJ leg flies on a LEG tail.
    pub class_upgrade: bool,
    pub origin: String,
    pub dest: String,
    pub start_min: i64,
    pub end_min: i64,
    pub duration_min: i64,
    /// Cheap-band minutes after the window.
    pub shift_plus: i64,
    /// Cheap-band minutes before the window.
    pub shift_minus: i64,
    /// Expensive-band minutes after the window.
    pub shift_plus_extra: i64,
    /// Expensive-band minutes before the window.
    pub shift_minus_extra: i64,
    /// Ferry minutes flown to reach this leg's origin.
    pub reposition_before_min: i64,
}

impl AssignedFlight {
    /// Total minutes moved past the window.
    pub fn total_shift_plus(&self) -> i64 {
        self.shift_plus + self.shift_plus_extra
    }

    /// Total minutes moved ahead of the window.
    pub fn total_shift_minus(&self) -> i64 {
        self.shift_minus + self.shift_minus_extra
    }

    /// Total shifted minutes in either direction.
    pub fn shifted_minutes(&self) -> i64 {
        self.total_shift_plus() + self.total_shift_minus()
    }
}

/// A leg sold to an outside operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutsourcedFlight {
    pub flight_id: String,
    pub owner_id: String,
    pub origin: String,
    pub dest: String,
    pub preferred_etd_min: i64,
}

/// Why a leg ended up without any disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnassignedReason {
    /// Optional positioning leg dropped.
    PositioningDropped,
    /// Leg could be neither flown nor outsourced.
    Uncovered,
}

/// A leg left without tail or outsource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedFlight {
    pub flight_id: String,
    pub owner_id: String,
    pub origin: String,
    pub dest: String,
    pub preferred_etd_min: i64,
    pub reason: UnassignedReason,
}

/// An empty ferry leg implied by the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositionLeg {
    pub tail_id: String,
    pub origin: String,
    pub dest: String,
    pub start_min: i64,
    pub duration_min: i64,
    /// Leg the tail arrives from; `None` for the first ferry of the day.
    pub source_flight: Option<String>,
    /// Leg the ferry positions for.
    pub target_flight: String,
}

/// Objective split by lever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub outsource: i64,
    pub unassigned: i64,
    pub shift_base: i64,
    pub shift_extra: i64,
    pub tail_swap: i64,
    pub class_upgrade: i64,
    pub reposition: i64,
}

impl CostBreakdown {
    /// Sum of all categories.
    pub fn total(&self) -> i64 {
        self.outsource
            + self.unassigned
            + self.shift_base
            + self.shift_extra
            + self.tail_swap
            + self.class_upgrade
            + self.reposition
    }
}

/// One ranked answer to a scheduling request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReschedulingSolution {
    /// Solver outcome for the solve that produced this answer.
    pub status: SolveStatus,
    /// Total weighted cost.
    pub objective: f64,
    /// Objective by category.
    pub breakdown: CostBreakdown,
    /// Legs flown internally, in input order.
    pub assigned: Vec<AssignedFlight>,
    /// Legs sold outside, in input order.
    pub outsourced: Vec<OutsourcedFlight>,
    /// Legs left without disposition, in input order.
    pub unassigned: Vec<UnassignedFlight>,
    /// Ferry legs, grouped by tail in flying order.
    pub repositions: Vec<RepositionLeg>,
}

impl ReschedulingSolution {
    /// Finds the assignment of a flight.
    pub fn assignment_for(&self, flight_id: &str) -> Option<&AssignedFlight> {
        self.assigned.iter().find(|a| a.flight_id == flight_id)
    }

    /// Legs flown by a tail, ordered by start.
    pub fn assignments_for_tail(&self, tail_id: &str) -> Vec<&AssignedFlight> {
        let mut rows: Vec<&AssignedFlight> =
            self.assigned.iter().filter(|a| a.tail_id == tail_id).collect();
        rows.sort_by_key(|a| a.start_min);
        rows
    }

    /// Whether a flight was outsourced.
    pub fn is_outsourced(&self, flight_id: &str) -> bool {
        self.outsourced.iter().any(|o| o.flight_id == flight_id)
    }

    /// Total shifted minutes across all assigned legs.
    pub fn shifted_minutes(&self) -> i64 {
        self.assigned.iter().map(AssignedFlight::shifted_minutes).sum()
    }

    /// Total ferry minutes.
    pub fn reposition_minutes(&self) -> i64 {
        self.repositions.iter().map(|r| r.duration_min).sum()
    }

    /// Number of legs with any disposition recorded.
    pub fn disposition_count(&self) -> usize {
        self.assigned.len() + self.outsourced.len() + self.unassigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(id: &str, tail: &str, start: i64, plus: i64, extra: i64) -> AssignedFlight {
        AssignedFlight {
            flight_id: id.into(),
            tail_id: tail.into(),
            original_tail_id: None,
            tail_swapped: false,
            class_upgrade: false,
            origin: "A".into(),
            dest: "B".into(),
            start_min: start,
            end_min: start + 60,
            duration_min: 60,
            shift_plus: plus,
            shift_minus: 0,
            shift_plus_extra: extra,
            shift_minus_extra: 0,
            reposition_before_min: 0,
        }
    }

    #[test]
    fn test_status_has_solution() {
        assert!(SolveStatus::Optimal.has_solution());
        assert!(SolveStatus::Feasible.has_solution());
        assert!(!SolveStatus::Infeasible.has_solution());
        assert!(!SolveStatus::TimedOut.has_solution());
    }

    #[test]
    fn test_breakdown_total() {
        let b = CostBreakdown {
            outsource: 1800,
            shift_base: 40,
            shift_extra: 200,
            reposition: 90,
            ..CostBreakdown::default()
        };
        assert_eq!(b.total(), 2130);
    }

    #[test]
    fn test_solution_queries() {
        let solution = ReschedulingSolution {
            status: SolveStatus::Optimal,
            objective: 0.0,
            breakdown: CostBreakdown::default(),
            assigned: vec![
                assigned("F2", "T1", 600, 10, 5),
                assigned("F1", "T1", 420, 0, 0),
                assigned("F3", "T2", 500, 0, 0),
            ],
            outsourced: vec![],
            unassigned: vec![],
            repositions: vec![],
        };

        let t1: Vec<&str> = solution
            .assignments_for_tail("T1")
            .iter()
            .map(|a| a.flight_id.as_str())
            .collect();
        assert_eq!(t1, vec!["F1", "F2"]);
        assert_eq!(solution.shifted_minutes(), 15);
        assert_eq!(solution.disposition_count(), 3);
        assert!(solution.assignment_for("F3").is_some());
        assert!(!solution.is_outsourced("F3"));
    }
}
