//! Negotiation scheduler (solver driver).
//!
//! Owns normalized copies of the request, builds a fresh constraint model
//! per call and re-solves it to enumerate up to `top_n` distinct answers.
//! After each accepted answer a no-good forbids its exact combination of
//! dispositions and start buckets, so the next answer differs in at least
//! one flight's tail, fallback or rounded departure.
//!
//! Answers are ranked by objective, then total shifted minutes, then their
//! flight-ordered signature.

use crate::cp::{
    BranchAndBoundSolver, ConstraintSolver, CpSolution, CpStatus, SolverConfig, TerminationReason,
};
use crate::error::{ConfigurationError, ModelBuildError, ScheduleError};
use crate::models::{
    AssignedFlight, ClassFit, CostBreakdown, Flight, LeverPolicy, OutsourcedFlight, RepositionLeg,
    ReschedulingSolution, SolveStatus, Tail, UnassignedFlight, UnassignedReason,
};
use crate::reposition::{
    build_initial_reposition_matrix, build_reposition_matrix, AirportTable, RepositionMatrix,
};
use crate::validation::{input_warnings, validate_input};

use super::builder::{FleetModel, FleetModelBuilder};

/// Default width of the start-time buckets used to tell answers apart.
pub const DEFAULT_SIGNATURE_BUCKET_MIN: i64 = 15;

/// Disposition of one flight in an answer signature.
type SignatureEntry = (String, String, i64);

/// Assigns flights to tails and ranks alternative schedules.
///
/// # Example
/// ```
/// use fleet_schedule::models::{Flight, LeverPolicy, Tail};
/// use fleet_schedule::scheduler::NegotiationScheduler;
///
/// let flights = vec![Flight::new("F1", "CYBW", "CYVR", 90, "CJ", "O1").with_window(480, 540, 500)];
/// let tails = vec![Tail::new("C-GCJ1", "CJ")];
///
/// let scheduler = NegotiationScheduler::new(&flights, &tails, LeverPolicy::default()).unwrap();
/// let (status, solutions) = scheduler.solve(5.0, 1, 1).unwrap();
/// assert!(status.has_solution());
/// assert_eq!(solutions[0].assigned[0].tail_id, "C-GCJ1");
/// ```
#[derive(Debug, Clone)]
pub struct NegotiationScheduler {
    flights: Vec<Flight>,
    tails: Vec<Tail>,
    policy: LeverPolicy,
    reposition: RepositionMatrix,
    initial_reposition: RepositionMatrix,
    signature_bucket_min: i64,
    seed: u64,
}

impl NegotiationScheduler {
    /// Validates and copies a request.
    ///
    /// Entities are normalized on the way in; the caller's values are never
    /// touched. Ferry minutes default to zero until a matrix or airport
    /// table is supplied.
    pub fn new(
        flights: &[Flight],
        tails: &[Tail],
        policy: LeverPolicy,
    ) -> Result<Self, ConfigurationError> {
        policy.validate()?;

        let flights: Vec<Flight> = flights.iter().map(Flight::normalized).collect();
        let tails: Vec<Tail> = tails.iter().map(Tail::normalized).collect();
        for flight in &flights {
            flight.validate()?;
            flight.check_horizon(policy.horizon_min)?;
        }
        for tail in &tails {
            tail.validate()?;
            tail.check_horizon(policy.horizon_min)?;
        }
        if policy.flex_pax_enabled && policy.flex_pax_cost_extra <= policy.flex_pax_cost_base {
            tracing::warn!(
                base = policy.flex_pax_cost_base,
                extra = policy.flex_pax_cost_extra,
                "flex extra rate does not exceed the base rate"
            );
        }
        validate_input(&flights, &tails).map_err(ConfigurationError::Invalid)?;

        for warning in input_warnings(&flights, &tails, policy.allow_class_upgrade) {
            tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        }

        let n = flights.len();
        let reposition = RepositionMatrix::zeros(n, n);
        let initial_reposition = RepositionMatrix::zeros(tails.len(), n);
        Ok(Self {
            flights,
            tails,
            policy,
            reposition,
            initial_reposition,
            signature_bucket_min: DEFAULT_SIGNATURE_BUCKET_MIN,
            seed: 0,
        })
    }

    /// Sets flight-to-flight ferry minutes from possibly ragged rows.
    ///
    /// Missing entries are padded with 0, surplus entries ignored.
    pub fn with_reposition(mut self, rows: &[Vec<i64>]) -> Result<Self, ConfigurationError> {
        let n = self.flights.len();
        self.reposition = RepositionMatrix::from_rows(rows, n, n)?;
        Ok(self)
    }

    /// Sets tail-to-flight ferry minutes from possibly ragged rows.
    pub fn with_initial_reposition(
        mut self,
        rows: &[Vec<i64>],
    ) -> Result<Self, ConfigurationError> {
        self.initial_reposition =
            RepositionMatrix::from_rows(rows, self.tails.len(), self.flights.len())?;
        Ok(self)
    }

    /// Sets a prebuilt flight-to-flight matrix, resized to the request.
    pub fn with_reposition_matrix(mut self, matrix: &RepositionMatrix) -> Self {
        let n = self.flights.len();
        self.reposition = matrix.resized(n, n);
        self
    }

    /// Sets a prebuilt tail-to-flight matrix, resized to the request.
    pub fn with_initial_reposition_matrix(mut self, matrix: &RepositionMatrix) -> Self {
        self.initial_reposition = matrix.resized(self.tails.len(), self.flights.len());
        self
    }

    /// Estimates both ferry matrices from airport coordinates.
    ///
    /// Pairs touching an unknown airport get the sentinel ferry time.
    pub fn with_airports(mut self, airports: &AirportTable) -> Self {
        self.reposition = build_reposition_matrix(&self.flights, airports);
        self.initial_reposition =
            build_initial_reposition_matrix(&self.tails, &self.flights, airports);

        let unknown = self.reposition.sentinel_count() + self.initial_reposition.sentinel_count();
        if unknown > 0 {
            tracing::warn!(pairs = unknown, "ferry times estimated with the unknown-airport sentinel");
        }
        self
    }

    /// Sets the start bucket width used to tell answers apart.
    pub fn with_signature_bucket(mut self, minutes: i64) -> Self {
        self.signature_bucket_min = minutes.max(1);
        self
    }

    /// Sets the seed for parallel worker diversification.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn tails(&self) -> &[Tail] {
        &self.tails
    }

    pub fn policy(&self) -> &LeverPolicy {
        &self.policy
    }

    pub fn reposition_matrix(&self) -> &RepositionMatrix {
        &self.reposition
    }

    pub fn initial_reposition_matrix(&self) -> &RepositionMatrix {
        &self.initial_reposition
    }

    /// Builds a fresh constraint model for the request.
    pub fn build_model(&self) -> Result<FleetModel, ModelBuildError> {
        FleetModelBuilder::new(&self.flights, &self.tails, &self.policy)
            .with_reposition(&self.reposition)
            .with_initial_reposition(&self.initial_reposition)
            .build()
    }

    /// Solves with the built-in branch-and-bound backend.
    ///
    /// `time_limit_s` applies to each re-solve; `workers` is the number of
    /// parallel search threads. Returns the status of the first solve and
    /// up to `top_n` ranked answers (at least one solve is attempted).
    pub fn solve(
        &self,
        time_limit_s: f64,
        workers: usize,
        top_n: usize,
    ) -> Result<(SolveStatus, Vec<ReschedulingSolution>), ScheduleError> {
        let config = SolverConfig::default()
            .with_time_limit_secs(time_limit_s)
            .with_workers(workers)
            .with_seed(self.seed);
        self.solve_with(&BranchAndBoundSolver::new(), &config, top_n)
    }

    /// Solves with any [`ConstraintSolver`].
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(solver = solver.name(), flights = self.flights.len(), tails = self.tails.len(), top_n = top_n)
    )]
    pub fn solve_with<S: ConstraintSolver>(
        &self,
        solver: &S,
        config: &SolverConfig,
        top_n: usize,
    ) -> Result<(SolveStatus, Vec<ReschedulingSolution>), ScheduleError> {
        let mut fleet = self.build_model()?;
        let mut status = None;
        let mut ranked: Vec<(i64, i64, Vec<SignatureEntry>, ReschedulingSolution)> = Vec::new();

        for round in 0..top_n.max(1) {
            let cp = solver.solve(&fleet.model, config)?;
            let round_status = solve_status(cp.status);
            status.get_or_insert(round_status);
            tracing::debug!(
                round,
                status = ?round_status,
                objective = cp.objective,
                nodes = cp.stats.nodes,
                "solve round"
            );
            if cp.stats.termination == TerminationReason::TimeLimit {
                tracing::warn!(round, elapsed = ?cp.stats.elapsed, "time limit reached");
            }
            if !cp.is_solution_found() {
                break;
            }

            let solution = self.extract(&fleet, &cp, round_status);
            let signature = self.signature(&solution);
            ranked.push((cp.objective, solution.shifted_minutes(), signature, solution));

            let no_good = fleet.no_good_for(&cp, self.signature_bucket_min);
            tracing::debug!(round, terms = no_good.terms.len(), "no-good added");
            fleet.model.add_no_good(no_good);
        }

        ranked.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        let solutions: Vec<ReschedulingSolution> =
            ranked.into_iter().map(|(_, _, _, s)| s).collect();
        let status = status.unwrap_or(SolveStatus::TimedOut);

        tracing::info!(?status, solutions = solutions.len(), "scheduling finished");
        Ok((status, solutions))
    }

    /// Reshapes solver values into the entity view.
    fn extract(
        &self,
        fleet: &FleetModel,
        cp: &CpSolution,
        status: SolveStatus,
    ) -> ReschedulingSolution {
        let policy = &self.policy;
        let mut breakdown = CostBreakdown::default();
        let mut repo_before = vec![0i64; self.flights.len()];
        let mut repositions = Vec::new();

        let start_of = |f: usize| cp.int_value(fleet.vars.flights[f].start);

        for (t, tail) in self.tails.iter().enumerate() {
            let order = fleet.tail_order(cp, t);

            if let (Some(&first), Some(position)) =
                (order.first(), tail.last_position_airport.as_ref())
            {
                let minutes = self.initial_reposition.get(t, first);
                repo_before[first] = minutes;
                if minutes > 0 {
                    repositions.push(RepositionLeg {
                        tail_id: tail.id.clone(),
                        origin: position.clone(),
                        dest: self.flights[first].origin.clone(),
                        start_min: tail.last_position_ready_min,
                        duration_min: minutes,
                        source_flight: None,
                        target_flight: self.flights[first].id.clone(),
                    });
                }
            }

            for pair in order.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let minutes = self.reposition.get(from, to);
                repo_before[to] = minutes;
                breakdown.reposition += minutes * policy.reposition_cost_per_min;
                if minutes > 0 {
                    let arrival = start_of(from) + self.flights[from].duration_min;
                    repositions.push(RepositionLeg {
                        tail_id: tail.id.clone(),
                        origin: self.flights[from].dest.clone(),
                        dest: self.flights[to].origin.clone(),
                        start_min: arrival + policy.turn_min,
                        duration_min: minutes,
                        source_flight: Some(self.flights[from].id.clone()),
                        target_flight: self.flights[to].id.clone(),
                    });
                }
            }
        }

        let mut assigned = Vec::new();
        let mut outsourced = Vec::new();
        let mut unassigned = Vec::new();

        for (f, flight) in self.flights.iter().enumerate() {
            let fv = &fleet.vars.flights[f];
            let plus = cp.int_value(fv.shift_plus);
            let minus = cp.int_value(fv.shift_minus);
            let plus_extra = fv.shift_plus_extra.map_or(0, |v| cp.int_value(v));
            let minus_extra = fv.shift_minus_extra.map_or(0, |v| cp.int_value(v));
            breakdown.shift_base += (plus + minus) * fv.bands.base_rate;
            breakdown.shift_extra += (plus_extra + minus_extra) * fv.bands.extra_rate;

            let pairing = fleet
                .assigned_tail(cp, f)
                .and_then(|t| fleet.vars.assign(f, t).map(|a| (t, *a)));

            if let Some((t, pair)) = pairing {
                if pair.swapped {
                    breakdown.tail_swap += policy.tail_swap_cost;
                }
                let upgrade = pair.fit == ClassFit::Upgrade;
                if upgrade {
                    breakdown.class_upgrade += policy.class_upgrade_cost;
                }
                let start = start_of(f);
                assigned.push(AssignedFlight {
                    flight_id: flight.id.clone(),
                    tail_id: self.tails[t].id.clone(),
                    original_tail_id: flight.current_tail_id.clone(),
                    tail_swapped: pair.swapped,
                    class_upgrade: upgrade,
                    origin: flight.origin.clone(),
                    dest: flight.dest.clone(),
                    start_min: start,
                    end_min: start + flight.duration_min,
                    duration_min: flight.duration_min,
                    shift_plus: plus,
                    shift_minus: minus,
                    shift_plus_extra: plus_extra,
                    shift_minus_extra: minus_extra,
                    reposition_before_min: repo_before[f],
                });
            } else if fv.outsource.is_some_and(|o| cp.value(o)) {
                breakdown.outsource += policy.outsource_cost;
                outsourced.push(OutsourcedFlight {
                    flight_id: flight.id.clone(),
                    owner_id: flight.owner_id.clone(),
                    origin: flight.origin.clone(),
                    dest: flight.dest.clone(),
                    preferred_etd_min: flight.preferred_etd_min,
                });
            } else {
                breakdown.unassigned += fv.unassigned_cost;
                let reason = if flight.is_skippable() && policy.allow_pos_skips {
                    UnassignedReason::PositioningDropped
                } else {
                    UnassignedReason::Uncovered
                };
                unassigned.push(UnassignedFlight {
                    flight_id: flight.id.clone(),
                    owner_id: flight.owner_id.clone(),
                    origin: flight.origin.clone(),
                    dest: flight.dest.clone(),
                    preferred_etd_min: flight.preferred_etd_min,
                    reason,
                });
            }
        }

        debug_assert_eq!(breakdown.total(), cp.objective);

        ReschedulingSolution {
            status,
            objective: cp.objective as f64,
            breakdown,
            assigned,
            outsourced,
            unassigned,
            repositions,
        }
    }

    /// Flight-ordered `(flight, disposition, start bucket)` list.
    fn signature(&self, solution: &ReschedulingSolution) -> Vec<SignatureEntry> {
        let bucket = self.signature_bucket_min;
        let mut entries: Vec<SignatureEntry> = solution
            .assigned
            .iter()
            .map(|a| {
                (
                    a.flight_id.clone(),
                    a.tail_id.clone(),
                    a.start_min.div_euclid(bucket),
                )
            })
            .chain(
                solution
                    .outsourced
                    .iter()
                    .map(|o| (o.flight_id.clone(), "~outsource".to_string(), 0)),
            )
            .chain(
                solution
                    .unassigned
                    .iter()
                    .map(|u| (u.flight_id.clone(), "~unassigned".to_string(), 0)),
            )
            .collect();
        entries.sort();
        entries
    }
}

fn solve_status(status: CpStatus) -> SolveStatus {
    match status {
        CpStatus::Optimal => SolveStatus::Optimal,
        CpStatus::Feasible => SolveStatus::Feasible,
        CpStatus::Infeasible => SolveStatus::Infeasible,
        CpStatus::Unknown => SolveStatus::TimedOut,
    }
}
