//! Fleet constraint model builder.
//!
//! Translates flights, tails and a lever policy into a [`CpModel`]:
//!
//! - one alternative per flight over its compatible tails plus the
//!   outsource / unassigned fallbacks
//! - a soft window per flight, with base and (flex) extra slack bands
//! - one sequence per tail whose transition gaps are turn + ferry minutes
//!
//! Variables are kept in a struct-of-arrays ([`FleetVars`]) indexed by
//! flight and tail position, so the driver never looks anything up by name.
//!
//! # Reference
//! - Grönkvist (2005), "The Tail Assignment Problem", Ch. 3
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

use crate::cp::{
    BoolVarId, CpModel, CpSolution, IntVarId, IntervalId, NoGood, NoGoodTerm, Sequence,
    SequenceId, SoftWindow,
};
use crate::error::ModelBuildError;
use crate::models::{class_fit, ClassFit, Flight, LeverPolicy, Tail};
use crate::reposition::RepositionMatrix;

/// Caps and rates of a flight's shift bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftBands {
    pub plus_base: i64,
    pub minus_base: i64,
    /// Zero unless flex banding is enabled.
    pub plus_extra: i64,
    pub minus_extra: i64,
    pub base_rate: i64,
    pub extra_rate: i64,
    pub flex: bool,
}

/// Derives the shift bands for one flight.
///
/// Without flex banding, each side has a single band capped by the flight
/// and policy caps. With flex banding, the outer bound is the flight cap
/// limited by both the policy's flex outer cap and its global shift cap;
/// the base band ends at the flight's flex boundary (itself limited by
/// `flex_pax_base_cap`) and the rest is the extra band. The base band is
/// always consumed first, whatever the two rates.
pub fn shift_bands(flight: &Flight, policy: &LeverPolicy) -> ShiftBands {
    let base_rate = flight
        .shift_cost_per_min
        .unwrap_or(policy.cost_per_min_shift);

    if !policy.flex_pax_enabled {
        return ShiftBands {
            plus_base: flight.shift_plus_cap.min(policy.max_shift_plus_min),
            minus_base: flight.shift_minus_cap.min(policy.max_shift_minus_min),
            plus_extra: 0,
            minus_extra: 0,
            base_rate,
            extra_rate: policy.flex_pax_cost_extra,
            flex: false,
        };
    }

    let plus_total = flight
        .shift_plus_cap
        .min(policy.flex_pax_plus_cap)
        .min(policy.max_shift_plus_min);
    let minus_total = flight
        .shift_minus_cap
        .min(policy.flex_pax_minus_cap)
        .min(policy.max_shift_minus_min);
    let plus_base = flight
        .flex_plus_cap()
        .min(policy.flex_pax_base_cap)
        .min(plus_total);
    let minus_base = flight
        .flex_minus_cap()
        .min(policy.flex_pax_base_cap)
        .min(minus_total);

    ShiftBands {
        plus_base,
        minus_base,
        plus_extra: plus_total - plus_base,
        minus_extra: minus_total - minus_base,
        base_rate,
        extra_rate: policy.flex_pax_cost_extra,
        flex: true,
    }
}

/// Variables of one flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightVars {
    pub start: IntVarId,
    pub shift_plus: IntVarId,
    pub shift_minus: IntVarId,
    pub shift_plus_extra: Option<IntVarId>,
    pub shift_minus_extra: Option<IntVarId>,
    pub outsource: Option<BoolVarId>,
    pub unassigned: BoolVarId,
    /// Objective coefficient of `unassigned`.
    pub unassigned_cost: i64,
    pub bands: ShiftBands,
}

/// A modeled flight/tail pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignVar {
    pub literal: BoolVarId,
    pub interval: IntervalId,
    pub fit: ClassFit,
    /// The tail differs from the flight's current tail.
    pub swapped: bool,
}

/// All decision variables, indexed by flight and tail position.
#[derive(Debug, Clone)]
pub struct FleetVars {
    pub flights: Vec<FlightVars>,
    /// One sequence per tail.
    pub tails: Vec<SequenceId>,
    assign: Vec<Option<AssignVar>>,
    /// Flight index behind each interval.
    interval_flight: Vec<usize>,
}

impl FleetVars {
    /// The pairing of flight `f` with tail `t`, if modeled.
    pub fn assign(&self, f: usize, t: usize) -> Option<&AssignVar> {
        self.assign
            .get(f * self.tails.len() + t)
            .and_then(Option::as_ref)
    }

    /// Number of modeled flight/tail pairings.
    pub fn pairing_count(&self) -> usize {
        self.assign.iter().filter(|a| a.is_some()).count()
    }

    /// Flight index of an interval.
    pub fn flight_of(&self, interval: IntervalId) -> Option<usize> {
        self.interval_flight.get(interval.index()).copied()
    }
}

/// A built model together with its variable map.
#[derive(Debug, Clone)]
pub struct FleetModel {
    pub model: CpModel,
    pub vars: FleetVars,
}

impl FleetModel {
    /// Tail index flying flight `f` in a solution.
    pub fn assigned_tail(&self, solution: &CpSolution, f: usize) -> Option<usize> {
        (0..self.vars.tails.len()).find(|&t| {
            self.vars
                .assign(f, t)
                .is_some_and(|a| solution.value(a.literal))
        })
    }

    /// Flight indices flown by tail `t`, in flying order.
    pub fn tail_order(&self, solution: &CpSolution, t: usize) -> Vec<usize> {
        solution
            .order(self.vars.tails[t])
            .iter()
            .filter_map(|&iv| self.vars.flight_of(iv))
            .collect()
    }

    /// A no-good forbidding this solution's dispositions and start buckets.
    ///
    /// Assigned flights contribute their tail literal and the
    /// `bucket_min`-wide bucket holding their start; outsourced and
    /// unassigned flights contribute their fallback literal only.
    pub fn no_good_for(&self, solution: &CpSolution, bucket_min: i64) -> NoGood {
        let bucket = bucket_min.max(1);
        let terms = self
            .vars
            .flights
            .iter()
            .enumerate()
            .map(|(f, fv)| match self.assigned_tail(solution, f) {
                Some(t) => {
                    let literal = self.vars.assign(f, t).map_or(fv.unassigned, |a| a.literal);
                    let lo = solution.int_value(fv.start).div_euclid(bucket) * bucket;
                    NoGoodTerm {
                        literal,
                        start: Some((fv.start, lo, lo + bucket - 1)),
                    }
                }
                None => {
                    let literal = match fv.outsource {
                        Some(o) if solution.value(o) => o,
                        _ => fv.unassigned,
                    };
                    NoGoodTerm {
                        literal,
                        start: None,
                    }
                }
            })
            .collect();
        NoGood { terms }
    }
}

/// Builds the fleet constraint model.
///
/// # Example
/// ```
/// use fleet_schedule::models::{Flight, LeverPolicy, Tail};
/// use fleet_schedule::scheduler::FleetModelBuilder;
///
/// let flights = vec![Flight::new("F1", "CYBW", "CYVR", 90, "CJ", "O1").at(480)];
/// let tails = vec![Tail::new("T1", "CJ")];
/// let policy = LeverPolicy::default();
///
/// let fleet = FleetModelBuilder::new(&flights, &tails, &policy).build().unwrap();
/// assert_eq!(fleet.model.interval_count(), 1);
/// ```
pub struct FleetModelBuilder<'a> {
    flights: &'a [Flight],
    tails: &'a [Tail],
    policy: &'a LeverPolicy,
    reposition: Option<&'a RepositionMatrix>,
    initial_reposition: Option<&'a RepositionMatrix>,
}

impl<'a> FleetModelBuilder<'a> {
    /// Creates a builder with no ferry times.
    pub fn new(flights: &'a [Flight], tails: &'a [Tail], policy: &'a LeverPolicy) -> Self {
        Self {
            flights,
            tails,
            policy,
            reposition: None,
            initial_reposition: None,
        }
    }

    /// Sets flight-to-flight ferry minutes.
    pub fn with_reposition(mut self, matrix: &'a RepositionMatrix) -> Self {
        self.reposition = Some(matrix);
        self
    }

    /// Sets tail-to-flight ferry minutes for each tail's first leg.
    pub fn with_initial_reposition(mut self, matrix: &'a RepositionMatrix) -> Self {
        self.initial_reposition = Some(matrix);
        self
    }

    /// Builds a fresh model.
    pub fn build(&self) -> Result<FleetModel, ModelBuildError> {
        let policy = self.policy;
        let n_tails = self.tails.len();
        let mut model = CpModel::new("fleet", policy.horizon_min);
        let mut flights = Vec::with_capacity(self.flights.len());
        let mut assign = vec![None; self.flights.len() * n_tails];
        let mut interval_flight = Vec::new();
        let mut per_tail: Vec<Vec<(usize, IntervalId)>> = vec![Vec::new(); n_tails];

        for (f, flight) in self.flights.iter().enumerate() {
            let id = &flight.id;
            let start = model.new_int_var(0, policy.horizon_min, format!("start[{id}]"));

            let bands = shift_bands(flight, policy);
            let shift_plus = model.new_int_var(0, bands.plus_base, format!("shift_plus[{id}]"));
            let shift_minus = model.new_int_var(0, bands.minus_base, format!("shift_minus[{id}]"));
            model.add_int_cost(shift_plus, bands.base_rate);
            model.add_int_cost(shift_minus, bands.base_rate);

            let (shift_plus_extra, shift_minus_extra) = if bands.flex {
                let plus = model.new_int_var(0, bands.plus_extra, format!("shift_plus_extra[{id}]"));
                let minus =
                    model.new_int_var(0, bands.minus_extra, format!("shift_minus_extra[{id}]"));
                model.add_int_cost(plus, bands.extra_rate);
                model.add_int_cost(minus, bands.extra_rate);
                (Some(plus), Some(minus))
            } else {
                (None, None)
            };

            model.add_soft_window(SoftWindow {
                start,
                earliest: flight.earliest_etd_min,
                latest: flight.latest_etd_min,
                early: std::iter::once(shift_minus).chain(shift_minus_extra).collect(),
                late: std::iter::once(shift_plus).chain(shift_plus_extra).collect(),
            });

            let pinned = self.pinned_tail(flight);
            let mut intervals = Vec::new();
            for (t, tail) in self.tails.iter().enumerate() {
                if pinned.is_some_and(|p| p != t) {
                    continue;
                }
                let fit = class_fit(&flight.fleet_class, &tail.fleet_class);
                if !self.usable(fit) {
                    continue;
                }

                let literal = model.new_bool_var(format!("assign[{id},{}]", tail.id));
                let swapped = flight
                    .current_tail_id
                    .as_deref()
                    .is_some_and(|current| current != tail.id);
                if swapped {
                    model.add_bool_cost(literal, policy.tail_swap_cost);
                }
                if fit == ClassFit::Upgrade {
                    model.add_bool_cost(literal, policy.class_upgrade_cost);
                }

                let interval = model.new_optional_interval(
                    format!("leg[{id},{}]", tail.id),
                    start,
                    flight.duration_min,
                    literal,
                    tail.available_from_min,
                    tail.available_to_min,
                );
                interval_flight.push(f);
                intervals.push(interval);
                per_tail[t].push((f, interval));
                assign[f * n_tails + t] = Some(AssignVar {
                    literal,
                    interval,
                    fit,
                    swapped,
                });
            }

            // Declared before `unassigned` so ties resolve to outsourcing.
            let outsource = flight.allow_outsource.then(|| {
                let b = model.new_bool_var(format!("outsource[{id}]"));
                model.add_bool_cost(b, policy.outsource_cost);
                b
            });
            let unassigned = model.new_bool_var(format!("unassigned[{id}]"));
            let unassigned_cost = if flight.is_skippable() && policy.allow_pos_skips {
                policy.pos_skip_cost
            } else {
                policy.unassigned_penalty
            };
            model.add_bool_cost(unassigned, unassigned_cost);

            model.add_alternative(
                format!("flight[{id}]"),
                start,
                intervals,
                outsource.into_iter().chain([unassigned]).collect(),
            );

            flights.push(FlightVars {
                start,
                shift_plus,
                shift_minus,
                shift_plus_extra,
                shift_minus_extra,
                outsource,
                unassigned,
                unassigned_cost,
                bands,
            });
        }

        let mut tails = Vec::with_capacity(n_tails);
        for (t, tail) in self.tails.iter().enumerate() {
            let members = &per_tail[t];
            let n = members.len();
            let mut seq = Sequence::new(
                format!("tail[{}]", tail.id),
                members.iter().map(|&(_, iv)| iv).collect(),
            );
            for (a, &(fa, _)) in members.iter().enumerate() {
                if tail.last_position_airport.is_some() {
                    seq.first_start[a] = tail.last_position_ready_min + self.initial_repo(t, fa);
                }
                for (b, &(fb, _)) in members.iter().enumerate() {
                    if a != b {
                        let repo = self.repo(fa, fb);
                        seq.transition_gap[a * n + b] = policy.turn_min + repo;
                        seq.transition_charge[a * n + b] = repo;
                    }
                }
            }
            seq.charge_weight = policy.reposition_cost_per_min;
            tails.push(model.add_sequence(seq));
        }

        model.check()?;
        tracing::debug!(
            flights = self.flights.len(),
            tails = n_tails,
            intervals = model.interval_count(),
            constraints = model.constraint_count(),
            "fleet model built"
        );

        Ok(FleetModel {
            model,
            vars: FleetVars {
                flights,
                tails,
                assign,
                interval_flight,
            },
        })
    }

    fn usable(&self, fit: ClassFit) -> bool {
        match fit {
            ClassFit::Exact => true,
            ClassFit::Upgrade => self.policy.allow_class_upgrade,
            ClassFit::Incompatible => false,
        }
    }

    /// The only tail a no-swap flight may use, when it is a usable one.
    fn pinned_tail(&self, flight: &Flight) -> Option<usize> {
        if flight.allow_tail_swap {
            return None;
        }
        let current = flight.current_tail_id.as_deref()?;
        self.tails.iter().position(|tail| {
            tail.id == current && self.usable(class_fit(&flight.fleet_class, &tail.fleet_class))
        })
    }

    fn repo(&self, from: usize, to: usize) -> i64 {
        self.reposition.map_or(0, |m| m.get(from, to))
    }

    fn initial_repo(&self, tail: usize, flight: usize) -> i64 {
        self.initial_reposition.map_or(0, |m| m.get(tail, flight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlightIntent;

    fn cj(id: &str, etd: i64) -> Flight {
        Flight::new(id, "CYBW", "CYVR", 60, "CJ", "O1").at(etd)
    }

    #[test]
    fn test_build_counts() {
        let flights = vec![cj("F1", 480), cj("F2", 600)];
        let tails = vec![Tail::new("T1", "CJ"), Tail::new("T2", "CJ"), Tail::new("L1", "LEG")];
        let policy = LeverPolicy::default();
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();

        // LEG tail is not offered without upgrades.
        assert_eq!(fleet.model.interval_count(), 4);
        assert_eq!(fleet.vars.pairing_count(), 4);
        assert!(fleet.vars.assign(0, 2).is_none());
        // 2 windows + 2 alternatives + 3 sequences
        assert_eq!(fleet.model.constraint_count(), 7);
        assert_eq!(fleet.vars.tails.len(), 3);
    }

    #[test]
    fn test_class_upgrade_pairing() {
        let flights = vec![cj("F1", 480)];
        let tails = vec![Tail::new("L1", "LEG")];
        let policy = LeverPolicy::default().with_class_upgrade(750);
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();

        let pair = fleet.vars.assign(0, 0).unwrap();
        assert_eq!(pair.fit, ClassFit::Upgrade);
        assert_eq!(fleet.model.bool_cost(pair.literal), 750);
    }

    #[test]
    fn test_swap_cost_and_pinning() {
        let tails = vec![Tail::new("T1", "CJ"), Tail::new("T2", "CJ")];
        let policy = LeverPolicy::default();

        let flights = vec![cj("F1", 480).with_current_tail("T2")];
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();
        let on_t1 = fleet.vars.assign(0, 0).unwrap();
        let on_t2 = fleet.vars.assign(0, 1).unwrap();
        assert!(on_t1.swapped);
        assert_eq!(fleet.model.bool_cost(on_t1.literal), policy.tail_swap_cost);
        assert!(!on_t2.swapped);
        assert_eq!(fleet.model.bool_cost(on_t2.literal), 0);

        let flights = vec![cj("F1", 480).with_current_tail("T2").with_tail_swap(false)];
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();
        assert!(fleet.vars.assign(0, 0).is_none());
        assert!(fleet.vars.assign(0, 1).is_some());
    }

    #[test]
    fn test_fallback_costs() {
        let flights = vec![
            cj("F1", 480).with_outsource(false),
            cj("P1", 500).with_intent(FlightIntent::Pos),
        ];
        let tails = vec![];
        let policy = LeverPolicy::default();
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();

        let f1 = &fleet.vars.flights[0];
        assert!(f1.outsource.is_none());
        assert_eq!(f1.unassigned_cost, policy.unassigned_penalty);

        let p1 = &fleet.vars.flights[1];
        let outsource = p1.outsource.unwrap();
        assert_eq!(fleet.model.bool_cost(outsource), policy.outsource_cost);
        assert_eq!(p1.unassigned_cost, policy.pos_skip_cost);
    }

    #[test]
    fn test_shift_bands_plain() {
        let policy = LeverPolicy::default().with_shift_caps(60, 10);
        let f = cj("F1", 480).with_shift_caps(90, 5).with_shift_cost(4);
        let bands = shift_bands(&f, &policy);
        assert_eq!(bands.plus_base, 60);
        assert_eq!(bands.minus_base, 5);
        assert_eq!(bands.plus_extra, 0);
        assert_eq!(bands.base_rate, 4);
        assert!(!bands.flex);
    }

    #[test]
    fn test_shift_bands_flex() {
        let policy = LeverPolicy::default().with_flex_pax(60, 30, 20, 1, 10);
        let f = cj("F1", 480)
            .with_shift_caps(60, 30)
            .with_original_caps(30, 10);
        let bands = shift_bands(&f, &policy);
        assert!(bands.flex);
        assert_eq!(bands.plus_base, 20);
        assert_eq!(bands.plus_extra, 40);
        assert_eq!(bands.minus_base, 10);
        assert_eq!(bands.minus_extra, 20);
        assert_eq!(bands.base_rate, policy.cost_per_min_shift);
        assert_eq!(bands.extra_rate, 10);
    }

    #[test]
    fn test_flex_bands_respect_global_caps() {
        let policy = LeverPolicy::default()
            .with_shift_caps(0, 0)
            .with_flex_pax(60, 30, 20, 1, 10);
        let bands = shift_bands(&cj("F1", 100), &policy);
        assert_eq!(
            (bands.plus_base, bands.plus_extra, bands.minus_base, bands.minus_extra),
            (0, 0, 0, 0)
        );

        let policy = LeverPolicy::default()
            .with_shift_caps(45, 15)
            .with_flex_pax(60, 30, 20, 1, 10);
        let bands = shift_bands(&cj("F1", 100), &policy);
        assert_eq!(bands.plus_base + bands.plus_extra, 45);
        assert_eq!(bands.minus_base + bands.minus_extra, 15);
        assert_eq!(bands.plus_base, 20);
        assert_eq!(bands.minus_base, 15);
    }

    #[test]
    fn test_flex_model_cannot_exceed_global_cap() {
        let flights = vec![cj("F1", 100)];
        let tails = vec![Tail::new("T1", "CJ").with_availability(140, 1440)];
        let policy = LeverPolicy::default()
            .with_shift_caps(0, 0)
            .with_flex_pax(60, 30, 20, 1, 10);
        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .build()
            .unwrap();

        let fv = &fleet.vars.flights[0];
        for var in [fv.shift_plus, fv.shift_minus]
            .into_iter()
            .chain(fv.shift_plus_extra)
            .chain(fv.shift_minus_extra)
        {
            assert_eq!(fleet.model.int_var(var).ub, 0);
        }
    }

    #[test]
    fn test_start_domain_is_the_horizon() {
        let flights = vec![cj("F1", 1_400)];
        let policy = LeverPolicy::default().with_horizon(720);
        let fleet = FleetModelBuilder::new(&flights, &[], &policy).build().unwrap();
        let start = fleet.model.int_var(fleet.vars.flights[0].start);
        assert_eq!((start.lb, start.ub), (0, 720));
    }

    #[test]
    fn test_transition_tables() {
        let flights = vec![
            Flight::new("F1", "CYBW", "CYVR", 60, "CJ", "O1").at(480),
            Flight::new("F2", "CYEG", "CYBW", 60, "CJ", "O2").at(700),
        ];
        let tails = vec![Tail::new("T1", "CJ").with_last_position("CYVR", 300)];
        let policy = LeverPolicy::default().with_turn(45);
        let repo = RepositionMatrix::from_rows(&[vec![0, 70], vec![0, 0]], 2, 2).unwrap();
        let initial = RepositionMatrix::from_rows(&[vec![80, 65]], 1, 2).unwrap();

        let fleet = FleetModelBuilder::new(&flights, &tails, &policy)
            .with_reposition(&repo)
            .with_initial_reposition(&initial)
            .build()
            .unwrap();

        let seq = fleet.model.sequence(fleet.vars.tails[0]);
        assert_eq!(seq.first_start, vec![380, 365]);
        assert_eq!(seq.gap(0, 1), 45 + 70);
        assert_eq!(seq.gap(1, 0), 45);
        assert_eq!(seq.charge(0, 1), 70);
        assert_eq!(seq.charge_weight, policy.reposition_cost_per_min);
    }
}
