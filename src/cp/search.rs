//! Exact branch-and-bound backend.
//!
//! Activities (alternatives) are decided one at a time. A decision picks a
//! fallback literal, or an interval together with its insertion position in
//! the interval's sequence. After every insertion the touched sequence is
//! re-timed exactly (see [`timing`](super::timing)), so a partial schedule
//! always carries its true shift cost.
//!
//! # Bound
//! `base + chosen fixed costs + Σ sequence shift costs + Σ per-activity
//! cheapest option over the undecided suffix`. Transition charges are left
//! out of the bound; inserting a member can make a sequence cheaper to
//! traverse.
//!
//! # Pruning
//! A sequence order with no feasible timing is abandoned immediately. This
//! is exact when transition gaps satisfy the triangle inequality
//! (`gap(a, c) ≤ gap(a, b) + size(b) + gap(b, c)`), which holds for turn
//! plus great-circle ferry times.
//!
//! # Portfolio
//! Workers share the incumbent. Worker 0 branches in chronological order;
//! the others perturb that order with a seeded RNG. The first worker to
//! exhaust its tree proves optimality and stops the rest.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::{BoolVarId, CpModel, IntVarId, IntervalId};
use super::solver::{
    ConstraintSolver, CpSolution, CpStatus, SearchStats, SolverConfig, TerminationReason,
};
use super::timing::{price_profile, Band, Slot, TimingTable, WindowPrice, INFEASIBLE};
use crate::error::ModelBuildError;

/// Nodes between two clock reads.
const CLOCK_CHECK_INTERVAL: u64 = 64;
/// Maximum release perturbation for diversified workers (minutes).
const ORDER_JITTER_MIN: i64 = 90;

/// Depth-first branch and bound with a parallel portfolio.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintSolver for BranchAndBoundSolver {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = model.name()))]
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Result<CpSolution, ModelBuildError> {
        model.check()?;
        let started = Instant::now();

        let compiled = Compiled::new(model);
        if compiled.infeasible {
            tracing::debug!("an alternative has no usable option");
            let stats = SearchStats {
                elapsed: started.elapsed(),
                ..SearchStats::default()
            };
            return Ok(CpSolution::empty(CpStatus::Infeasible, stats));
        }

        let deadline = started.checked_add(config.time_limit);
        let incumbent = SharedIncumbent::new();
        let stop = AtomicBool::new(false);
        let completed = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let workers = config.workers.max(1);

        let ctx = SearchContext {
            compiled: &compiled,
            incumbent: &incumbent,
            stop: &stop,
            deadline,
        };
        let completed_ref = &completed;
        let nodes_ref = &nodes;

        std::thread::scope(|scope| {
            for id in 0..workers {
                let order = compiled.branching_order(id, config.seed);
                scope.spawn(move || {
                    let mut worker = Worker::new(ctx, id, order);
                    let finished = worker.run();
                    nodes_ref.fetch_add(worker.nodes, Ordering::Relaxed);
                    if finished {
                        completed_ref.store(true, Ordering::SeqCst);
                        ctx.stop.store(true, Ordering::SeqCst);
                    }
                });
            }
        });

        let completed = completed.load(Ordering::SeqCst);
        let stats = SearchStats {
            nodes: nodes.load(Ordering::Relaxed),
            solutions: incumbent.solutions.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
            termination: if completed {
                TerminationReason::Completed
            } else {
                TerminationReason::TimeLimit
            },
        };

        let best = incumbent.take();
        let status = match (best.is_some(), completed) {
            (true, true) => CpStatus::Optimal,
            (true, false) => CpStatus::Feasible,
            (false, true) => CpStatus::Infeasible,
            (false, false) => CpStatus::Unknown,
        };
        tracing::debug!(
            ?status,
            nodes = stats.nodes,
            solutions = stats.solutions,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search finished"
        );

        Ok(match best {
            Some(best) => compiled.materialize(best, status, stats),
            None => CpSolution::empty(status, stats),
        })
    }
}

// ======================== Compiled model ========================

#[derive(Debug, Clone, Copy)]
enum Choice {
    Interval {
        presence: BoolVarId,
        /// `(sequence, local position)` when the interval is sequenced.
        seq: Option<(usize, usize)>,
    },
    Fallback(BoolVarId),
}

#[derive(Debug, Clone)]
struct Opt {
    choice: Choice,
    lo: i64,
    hi: i64,
    fixed: i64,
    /// `fixed` plus the cheapest start price in `[lo, hi]`.
    bound: i64,
    standalone_start: i64,
}

impl Opt {
    fn literal(&self) -> BoolVarId {
        match self.choice {
            Choice::Interval { presence, .. } => presence,
            Choice::Fallback(b) => b,
        }
    }

    fn sequenced(&self) -> Option<(usize, usize)> {
        match self.choice {
            Choice::Interval { seq, .. } => seq,
            Choice::Fallback(_) => None,
        }
    }

    /// Cost charged when the option is picked, before sequence timing.
    fn pick_cost(&self) -> i64 {
        if self.sequenced().is_some() {
            self.fixed
        } else {
            self.bound
        }
    }
}

#[derive(Debug, Clone)]
struct Activity {
    start: IntVarId,
    profile: Vec<i64>,
    options: Vec<Opt>,
    bound: i64,
    release: i64,
}

#[derive(Debug, Clone, Copy)]
struct SeqSlot {
    activity: usize,
    size: i64,
    lo: i64,
    hi: i64,
}

#[derive(Debug, Clone)]
struct CompiledNoGood {
    /// `(activity, option)` pairs that must all be picked.
    picks: Vec<(usize, usize)>,
    /// `(activity, lo, hi)` start ranges that must all hold.
    ranges: Vec<(usize, i64, i64)>,
}

impl CompiledNoGood {
    fn holds(&self, picked: &[usize], starts: &[i64]) -> bool {
        self.picks.iter().all(|&(a, o)| picked[a] == o)
            && self
                .ranges
                .iter()
                .all(|&(a, lo, hi)| starts[a] >= lo && starts[a] <= hi)
    }
}

struct Compiled<'m> {
    model: &'m CpModel,
    span: i64,
    activities: Vec<Activity>,
    windows: Vec<WindowPrice>,
    window_starts: Vec<IntVarId>,
    /// Per sequence, per local position.
    sequences: Vec<Vec<Option<SeqSlot>>>,
    no_goods: Vec<CompiledNoGood>,
    /// Values of integer variables no alternative decides.
    free_values: Vec<(IntVarId, i64)>,
    base_cost: i64,
    infeasible: bool,
}

/// Earliest minimum of `profile` over `[lo, hi]`.
fn min_in(profile: &[i64], lo: i64, hi: i64) -> Option<(i64, i64)> {
    let lo = lo.max(0);
    let hi = hi.min(profile.len() as i64 - 1);
    let mut best: Option<(i64, i64)> = None;
    for s in lo..=hi {
        let p = profile[s as usize];
        if p < INFEASIBLE && best.map_or(true, |(b, _)| p < b) {
            best = Some((p, s));
        }
    }
    best
}

impl<'m> Compiled<'m> {
    fn new(model: &'m CpModel) -> Self {
        let span = model
            .alternatives()
            .iter()
            .map(|a| model.int_var(a.start).ub)
            .chain(model.windows().iter().map(|w| model.int_var(w.start).ub))
            .fold(model.horizon(), i64::max)
            .max(0);

        let windows: Vec<WindowPrice> = model
            .windows()
            .iter()
            .map(|w| {
                let band = |&var: &IntVarId| Band {
                    var,
                    cap: model.int_var(var).ub,
                    coef: model.int_cost(var),
                };
                WindowPrice::new(
                    w.earliest,
                    w.latest,
                    w.early.iter().map(band).collect(),
                    w.late.iter().map(band).collect(),
                )
            })
            .collect();
        let window_starts: Vec<IntVarId> = model.windows().iter().map(|w| w.start).collect();

        let profile_of = |start: IntVarId| -> Vec<i64> {
            let var = model.int_var(start);
            let own: Vec<WindowPrice> = windows
                .iter()
                .zip(&window_starts)
                .filter(|(_, &s)| s == start)
                .map(|(w, _)| w.clone())
                .collect();
            let coef = model.int_cost(start);
            let mut profile = price_profile(&own, var.lb, var.ub, span);
            if coef != 0 {
                for (s, p) in profile.iter_mut().enumerate() {
                    if *p < INFEASIBLE {
                        *p += coef * s as i64;
                    }
                }
            }
            profile
        };

        let mut seq_of = vec![None; model.interval_count()];
        for (s, seq) in model.sequences().iter().enumerate() {
            for (local, iv) in seq.intervals.iter().enumerate() {
                seq_of[iv.index()] = Some((s, local));
            }
        }
        let mut sequences: Vec<Vec<Option<SeqSlot>>> = model
            .sequences()
            .iter()
            .map(|seq| vec![None; seq.len()])
            .collect();

        let mut activities = Vec::with_capacity(model.alternatives().len());
        let mut literal_owner = vec![None; model.bool_count()];
        let mut start_owner = vec![None; model.int_count()];
        let mut infeasible = false;

        for (a, alt) in model.alternatives().iter().enumerate() {
            let var = model.int_var(alt.start);
            let profile = profile_of(alt.start);
            let mut options = Vec::new();

            for &iv in &alt.intervals {
                let interval = model.interval(iv);
                let lo = var.lb.max(interval.start_min);
                let hi = var.ub.min(interval.end_max - interval.size);
                let Some((price, at)) = min_in(&profile, lo, hi) else {
                    continue;
                };
                let fixed = model.bool_cost(interval.presence);
                let seq = seq_of[iv.index()];
                if let Some((s, local)) = seq {
                    sequences[s][local] = Some(SeqSlot {
                        activity: a,
                        size: interval.size,
                        lo,
                        hi,
                    });
                }
                literal_owner[interval.presence.index()] = Some((a, options.len()));
                options.push(Opt {
                    choice: Choice::Interval {
                        presence: interval.presence,
                        seq,
                    },
                    lo,
                    hi,
                    fixed,
                    bound: fixed + price,
                    standalone_start: at,
                });
            }

            for &b in &alt.fallbacks {
                let Some((price, at)) = min_in(&profile, var.lb, var.ub) else {
                    continue;
                };
                let fixed = model.bool_cost(b);
                literal_owner[b.index()] = Some((a, options.len()));
                options.push(Opt {
                    choice: Choice::Fallback(b),
                    lo: var.lb,
                    hi: var.ub,
                    fixed,
                    bound: fixed + price,
                    standalone_start: at,
                });
            }

            if options.is_empty() {
                infeasible = true;
            }
            start_owner[alt.start.index()] = Some(a);
            let bound = options.iter().map(|o| o.bound).min().unwrap_or(INFEASIBLE);
            let release = profile
                .iter()
                .position(|&p| p < INFEASIBLE)
                .unwrap_or(0) as i64;
            activities.push(Activity {
                start: alt.start,
                profile,
                options,
                bound,
                release,
            });
        }

        // Integer variables outside every alternative.
        let mut band_vars = vec![false; model.int_count()];
        for w in model.windows() {
            for v in w.early.iter().chain(&w.late) {
                band_vars[v.index()] = true;
            }
        }
        let mut free_values = Vec::new();
        let mut base_cost = 0;
        for i in 0..model.int_count() {
            if start_owner[i].is_some() || band_vars[i] {
                continue;
            }
            let id = IntVarId::from_index(i);
            let var = model.int_var(id);
            if window_starts.contains(&id) {
                match min_in(&profile_of(id), var.lb, var.ub) {
                    Some((price, at)) => {
                        base_cost += price;
                        free_values.push((id, at));
                    }
                    None => infeasible = true,
                }
            } else {
                base_cost += model.int_cost(id) * var.lb;
                free_values.push((id, var.lb));
            }
        }

        let no_goods = model
            .no_goods()
            .iter()
            .filter_map(|ng| {
                let mut picks = Vec::new();
                let mut ranges = Vec::new();
                for term in &ng.terms {
                    // A literal no alternative owns is never true.
                    let owner = literal_owner[term.literal.index()]?;
                    picks.push(owner);
                    if let Some((var, lo, hi)) = term.start {
                        match start_owner[var.index()] {
                            Some(a) => ranges.push((a, lo, hi)),
                            None => {
                                let value = free_values
                                    .iter()
                                    .find(|(v, _)| *v == var)
                                    .map(|&(_, x)| x)
                                    .unwrap_or(model.int_var(var).lb);
                                if value < lo || value > hi {
                                    return None;
                                }
                            }
                        }
                    }
                }
                Some(CompiledNoGood { picks, ranges })
            })
            .collect();

        Self {
            model,
            span,
            activities,
            windows,
            window_starts,
            sequences,
            no_goods,
            free_values,
            base_cost,
            infeasible,
        }
    }

    /// Activity order explored by worker `id`.
    fn branching_order(&self, id: usize, seed: u64) -> Vec<usize> {
        let mut keyed: Vec<(i64, usize)> = if id == 0 {
            self.activities
                .iter()
                .enumerate()
                .map(|(a, act)| (act.release, a))
                .collect()
        } else {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id as u64));
            self.activities
                .iter()
                .enumerate()
                .map(|(a, act)| (act.release + rng.random_range(0..=ORDER_JITTER_MIN), a))
                .collect()
        };
        keyed.sort();
        keyed.into_iter().map(|(_, a)| a).collect()
    }

    fn materialize(&self, best: Incumbent, status: CpStatus, stats: SearchStats) -> CpSolution {
        let model = self.model;
        let mut bool_values = vec![false; model.bool_count()];
        let mut int_values: Vec<i64> = (0..model.int_count())
            .map(|i| model.int_var(IntVarId::from_index(i)).lb)
            .collect();

        for &(var, value) in &self.free_values {
            int_values[var.index()] = value;
        }
        for (a, act) in self.activities.iter().enumerate() {
            let opt = &act.options[best.picked[a]];
            bool_values[opt.literal().index()] = true;
            int_values[act.start.index()] = best.starts[a];
        }
        for (w, start) in self.windows.iter().zip(&self.window_starts) {
            let value = int_values[start.index()];
            w.assign(value, &mut int_values);
        }

        let sequence_orders: Vec<Vec<IntervalId>> = best
            .members
            .iter()
            .zip(model.sequences())
            .map(|(members, seq)| members.iter().map(|&l| seq.intervals[l]).collect())
            .collect();

        debug_assert_eq!(
            model.objective_value(&bool_values, &int_values, &sequence_orders),
            best.cost
        );

        CpSolution {
            status,
            objective: best.cost,
            bool_values,
            int_values,
            sequence_orders,
            stats,
        }
    }
}

/// Shift cost (and optionally starts) of one sequence order.
fn time_sequence(
    table: &mut TimingTable,
    compiled: &Compiled<'_>,
    seq: usize,
    members: &[usize],
    masked: &[Option<Vec<i64>>],
    with_starts: bool,
) -> Option<(i64, Vec<i64>)> {
    if members.is_empty() {
        return Some((0, Vec::new()));
    }
    let def = &compiled.model.sequences()[seq];
    let mut slots = Vec::with_capacity(members.len());
    for &local in members {
        let slot = compiled.sequences[seq][local]?;
        let profile = masked
            .get(slot.activity)
            .and_then(|m| m.as_deref())
            .unwrap_or(&compiled.activities[slot.activity].profile);
        slots.push(Slot {
            size: slot.size,
            lo: slot.lo,
            hi: slot.hi,
            profile,
        });
    }
    let gaps: Vec<i64> = members.windows(2).map(|w| def.gap(w[0], w[1])).collect();
    let first = def.first_start[members[0]];

    if with_starts {
        table.solve(&slots, first, &gaps)
    } else {
        table.min_cost(&slots, first, &gaps).map(|c| (c, Vec::new()))
    }
}

fn sequence_charge(compiled: &Compiled<'_>, seq: usize, members: &[usize]) -> i64 {
    let def = &compiled.model.sequences()[seq];
    members
        .windows(2)
        .map(|w| def.charge(w[0], w[1]) * def.charge_weight)
        .sum()
}

// ======================== Shared incumbent ========================

#[derive(Debug, Clone)]
struct Incumbent {
    cost: i64,
    picked: Vec<usize>,
    starts: Vec<i64>,
    members: Vec<Vec<usize>>,
}

#[derive(Debug)]
struct SharedIncumbent {
    best: Mutex<Option<Incumbent>>,
    best_cost: AtomicI64,
    solutions: AtomicU64,
}

impl SharedIncumbent {
    fn new() -> Self {
        Self {
            best: Mutex::new(None),
            best_cost: AtomicI64::new(i64::MAX),
            solutions: AtomicU64::new(0),
        }
    }

    fn peek(&self) -> i64 {
        self.best_cost.load(Ordering::Acquire)
    }

    fn try_update(&self, candidate: Incumbent, worker: usize) -> bool {
        if candidate.cost >= self.peek() {
            return false;
        }
        let mut guard = self.best.lock().unwrap_or_else(|e| e.into_inner());
        let current = guard.as_ref().map_or(i64::MAX, |b| b.cost);
        if candidate.cost >= current {
            return false;
        }
        tracing::info!(old_cost = current, new_cost = candidate.cost, worker, "new incumbent");
        self.best_cost.store(candidate.cost, Ordering::Release);
        self.solutions.fetch_add(1, Ordering::Relaxed);
        *guard = Some(candidate);
        true
    }

    fn take(&self) -> Option<Incumbent> {
        self.best.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

// ======================== Worker ========================

#[derive(Clone, Copy)]
struct SearchContext<'c, 'm> {
    compiled: &'c Compiled<'m>,
    incumbent: &'c SharedIncumbent,
    stop: &'c AtomicBool,
    deadline: Option<Instant>,
}

struct Child {
    option: usize,
    position: usize,
    shift: i64,
    charge: i64,
    bound: i64,
    estimate: i64,
}

struct Worker<'c, 'm> {
    ctx: SearchContext<'c, 'm>,
    id: usize,
    order: Vec<usize>,
    /// `suffix[d]` = Σ cheapest option bound over `order[d..]`.
    suffix: Vec<i64>,
    members: Vec<Vec<usize>>,
    shift: Vec<i64>,
    charge: Vec<i64>,
    picked: Vec<usize>,
    fixed: i64,
    table: TimingTable,
    nodes: u64,
    aborted: bool,
}

impl<'c, 'm> Worker<'c, 'm> {
    fn new(ctx: SearchContext<'c, 'm>, id: usize, order: Vec<usize>) -> Self {
        let c = ctx.compiled;
        let mut suffix = vec![0i64; order.len() + 1];
        for d in (0..order.len()).rev() {
            suffix[d] = suffix[d + 1] + c.activities[order[d]].bound;
        }
        let n_seq = c.sequences.len();
        Self {
            ctx,
            id,
            order,
            suffix,
            members: vec![Vec::new(); n_seq],
            shift: vec![0; n_seq],
            charge: vec![0; n_seq],
            picked: vec![usize::MAX; c.activities.len()],
            fixed: 0,
            table: TimingTable::new(c.span),
            nodes: 0,
            aborted: false,
        }
    }

    /// Explores the whole tree. Returns `false` if interrupted.
    fn run(&mut self) -> bool {
        self.dfs(0);
        !self.aborted
    }

    fn should_stop(&mut self) -> bool {
        if self.ctx.stop.load(Ordering::Relaxed) {
            return true;
        }
        if self.nodes % CLOCK_CHECK_INTERVAL == CLOCK_CHECK_INTERVAL - 1 {
            if let Some(deadline) = self.ctx.deadline {
                if Instant::now() >= deadline {
                    self.ctx.stop.store(true, Ordering::SeqCst);
                    return true;
                }
            }
        }
        false
    }

    fn dfs(&mut self, depth: usize) {
        if self.should_stop() {
            self.aborted = true;
            return;
        }
        self.nodes += 1;

        let c = self.ctx.compiled;
        let shift_sum: i64 = self.shift.iter().sum();
        let charge_sum: i64 = self.charge.iter().sum();
        let settled = c.base_cost + self.fixed;
        if settled + shift_sum + self.suffix[depth] >= self.ctx.incumbent.peek() {
            return;
        }
        if depth == self.order.len() {
            self.leaf();
            return;
        }

        let a = self.order[depth];
        let rest = self.suffix[depth + 1];
        let mut children = Vec::new();
        for (o, opt) in c.activities[a].options.iter().enumerate() {
            match opt.sequenced() {
                None => {
                    let bound = settled + opt.pick_cost() + shift_sum + rest;
                    children.push(Child {
                        option: o,
                        position: 0,
                        shift: 0,
                        charge: 0,
                        bound,
                        estimate: bound + charge_sum,
                    });
                }
                Some((s, local)) => {
                    let len = self.members[s].len();
                    for position in 0..=len {
                        let mut candidate = self.members[s].clone();
                        candidate.insert(position, local);
                        let Some((shift, _)) =
                            time_sequence(&mut self.table, c, s, &candidate, &[], false)
                        else {
                            continue;
                        };
                        let charge = sequence_charge(c, s, &candidate);
                        let bound =
                            settled + opt.fixed + shift_sum - self.shift[s] + shift + rest;
                        children.push(Child {
                            option: o,
                            position,
                            shift,
                            charge,
                            bound,
                            estimate: bound + charge_sum - self.charge[s] + charge,
                        });
                    }
                }
            }
        }
        children.sort_by_key(|ch| ch.estimate);

        for child in children {
            if child.bound >= self.ctx.incumbent.peek() {
                continue;
            }
            let opt = &c.activities[a].options[child.option];
            self.picked[a] = child.option;
            self.fixed += opt.pick_cost();

            match opt.sequenced() {
                None => self.dfs(depth + 1),
                Some((s, local)) => {
                    let saved = (self.shift[s], self.charge[s]);
                    self.members[s].insert(child.position, local);
                    self.shift[s] = child.shift;
                    self.charge[s] = child.charge;
                    self.dfs(depth + 1);
                    self.members[s].remove(child.position);
                    (self.shift[s], self.charge[s]) = saved;
                }
            }

            self.fixed -= opt.pick_cost();
            self.picked[a] = usize::MAX;
            if self.aborted {
                return;
            }
        }
    }

    fn leaf(&mut self) {
        let c = self.ctx.compiled;
        let presence: i64 = c
            .activities
            .iter()
            .zip(&self.picked)
            .map(|(act, &o)| act.options[o].fixed)
            .sum();
        let charges: i64 = self.charge.iter().sum();

        let mut forbidden = Vec::new();
        let Some((timing, starts)) = self.time_leaf(&mut forbidden, c.no_goods.len()) else {
            return;
        };
        let cost = c.base_cost + presence + charges + timing;

        let candidate = Incumbent {
            cost,
            picked: self.picked.clone(),
            starts,
            members: self.members.clone(),
        };
        self.ctx.incumbent.try_update(candidate, self.id);
    }

    /// Cheapest timing of the current leaf that violates no no-good.
    ///
    /// A violated no-good is repaired by forbidding one of its start ranges
    /// at a time; each no-good needs at most one repair along a path.
    fn time_leaf(
        &mut self,
        forbidden: &mut Vec<(usize, i64, i64)>,
        budget: usize,
    ) -> Option<(i64, Vec<i64>)> {
        let c = self.ctx.compiled;
        let (cost, starts) = self.time_all(forbidden)?;
        let Some(violated) = c.no_goods.iter().find(|ng| ng.holds(&self.picked, &starts)) else {
            return Some((cost, starts));
        };
        if budget == 0 {
            return None;
        }

        let mut best: Option<(i64, Vec<i64>)> = None;
        for &range in &violated.ranges {
            forbidden.push(range);
            if let Some(found) = self.time_leaf(forbidden, budget - 1) {
                if best.as_ref().map_or(true, |b| found.0 < b.0) {
                    best = Some(found);
                }
            }
            forbidden.pop();
        }
        best
    }

    /// Timing cost and starts of every activity under forbidden ranges.
    fn time_all(&mut self, forbidden: &[(usize, i64, i64)]) -> Option<(i64, Vec<i64>)> {
        let c = self.ctx.compiled;
        let n = c.activities.len();

        let mut masked: Vec<Option<Vec<i64>>> = Vec::new();
        if !forbidden.is_empty() {
            masked = vec![None; n];
            for &(a, lo, hi) in forbidden {
                let profile = masked[a].get_or_insert_with(|| c.activities[a].profile.clone());
                for s in lo.max(0)..=hi.min(c.span) {
                    profile[s as usize] = INFEASIBLE;
                }
            }
        }

        let mut starts = vec![0i64; n];
        let mut cost = 0;
        for (s, members) in self.members.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let (shift, seq_starts) = time_sequence(&mut self.table, c, s, members, &masked, true)?;
            cost += shift;
            for (&local, &start) in members.iter().zip(&seq_starts) {
                if let Some(slot) = c.sequences[s][local] {
                    starts[slot.activity] = start;
                }
            }
        }

        for (a, act) in c.activities.iter().enumerate() {
            let opt = &act.options[self.picked[a]];
            if opt.sequenced().is_some() {
                continue;
            }
            match masked.get(a).and_then(|m| m.as_deref()) {
                Some(profile) => {
                    let (price, at) = min_in(profile, opt.lo, opt.hi)?;
                    cost += price;
                    starts[a] = at;
                }
                None => {
                    cost += opt.bound - opt.fixed;
                    starts[a] = opt.standalone_start;
                }
            }
        }

        Some((cost, starts))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cp::model::{NoGood, NoGoodTerm, Sequence, SoftWindow};

    struct Job {
        start: IntVarId,
        on: Vec<BoolVarId>,
        skip: BoolVarId,
        late: IntVarId,
    }

    /// Jobs on `machines` unary machines; each may be skipped at `skip_cost`.
    fn jobs_model(
        windows: &[(i64, i64, i64)],
        machines: usize,
        skip_cost: i64,
        gap: i64,
    ) -> (CpModel, Vec<Job>) {
        let mut m = CpModel::new("jobs", 200);
        let mut per_machine: Vec<Vec<IntervalId>> = vec![Vec::new(); machines];
        let mut jobs = Vec::new();

        for (j, &(earliest, latest, size)) in windows.iter().enumerate() {
            let start = m.new_int_var(0, 200, format!("start[{j}]"));
            let late = m.new_int_var(0, 100, format!("late[{j}]"));
            m.add_int_cost(late, 1);
            m.add_soft_window(SoftWindow {
                start,
                earliest,
                latest,
                early: vec![],
                late: vec![late],
            });

            let mut on = Vec::new();
            let mut intervals = Vec::new();
            for (k, list) in per_machine.iter_mut().enumerate() {
                let p = m.new_bool_var(format!("on[{j},{k}]"));
                let iv = m.new_optional_interval(format!("iv[{j},{k}]"), start, size, p, 0, 200);
                list.push(iv);
                intervals.push(iv);
                on.push(p);
            }
            let skip = m.new_bool_var(format!("skip[{j}]"));
            m.add_bool_cost(skip, skip_cost);
            m.add_alternative(format!("job[{j}]"), start, intervals, vec![skip]);
            jobs.push(Job {
                start,
                on,
                skip,
                late,
            });
        }

        for (k, list) in per_machine.into_iter().enumerate() {
            let mut seq = Sequence::new(format!("machine[{k}]"), list);
            let n = seq.len();
            seq.transition_gap = vec![gap; n * n];
            m.add_sequence(seq);
        }
        (m, jobs)
    }

    fn config(workers: usize) -> SolverConfig {
        SolverConfig::default()
            .with_time_limit_secs(10.0)
            .with_workers(workers)
    }

    #[test]
    fn test_two_machines_no_delay() {
        let (m, jobs) = jobs_model(&[(0, 0, 30), (0, 0, 30)], 2, 1000, 0);
        let sol = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();

        assert_eq!(sol.status, CpStatus::Optimal);
        assert_eq!(sol.objective, 0);
        for job in &jobs {
            assert_eq!(sol.int_value(job.start), 0);
            assert!(!sol.value(job.skip));
            assert_eq!(job.on.iter().filter(|&&p| sol.value(p)).count(), 1);
        }
    }

    #[test]
    fn test_single_machine_delays_second_job() {
        let (m, jobs) = jobs_model(&[(0, 0, 30), (10, 10, 30)], 1, 1000, 5);
        let sol = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();

        assert_eq!(sol.status, CpStatus::Optimal);
        // Job 0 at 0, job 1 pushed from 10 to 35.
        assert_eq!(sol.int_value(jobs[0].start), 0);
        assert_eq!(sol.int_value(jobs[1].start), 35);
        assert_eq!(sol.int_value(jobs[1].late), 25);
        assert_eq!(sol.objective, 25);
        assert_eq!(sol.order(crate::cp::model::SequenceId::from_index(0)).len(), 2);
    }

    #[test]
    fn test_skip_is_cheaper_than_long_delay() {
        let (m, jobs) = jobs_model(&[(0, 0, 100), (0, 0, 100)], 1, 50, 0);
        let sol = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();

        assert_eq!(sol.status, CpStatus::Optimal);
        assert_eq!(sol.objective, 50);
        let skipped = jobs.iter().filter(|j| sol.value(j.skip)).count();
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_infeasible_without_fallback() {
        let mut m = CpModel::new("tight", 100);
        let start = m.new_int_var(0, 100, "s");
        let p = m.new_bool_var("p");
        // Interval cannot fit before its end bound.
        let iv = m.new_optional_interval("iv", start, 50, p, 60, 100);
        m.add_alternative("only", start, vec![iv], vec![]);

        let sol = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();
        assert_eq!(sol.status, CpStatus::Infeasible);
        assert!(!sol.is_solution_found());
    }

    #[test]
    fn test_no_good_forces_next_best() {
        let (mut m, jobs) = jobs_model(&[(0, 0, 30)], 2, 1000, 0);
        let first = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();
        let used = jobs[0].on.iter().position(|&p| first.value(p)).unwrap();

        m.add_no_good(NoGood {
            terms: vec![NoGoodTerm {
                literal: jobs[0].on[used],
                start: Some((jobs[0].start, 0, 14)),
            }],
        });
        let second = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();
        assert_eq!(second.status, CpStatus::Optimal);
        assert_eq!(second.objective, 0);
        // The other machine at the same time is just as good.
        assert!(!second.value(jobs[0].on[used]));
    }

    #[test]
    fn test_no_good_repairs_start_bucket() {
        let (mut m, jobs) = jobs_model(&[(0, 0, 30)], 1, 1000, 0);
        m.add_no_good(NoGood {
            terms: vec![NoGoodTerm {
                literal: jobs[0].on[0],
                start: Some((jobs[0].start, 0, 14)),
            }],
        });
        let sol = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();
        assert_eq!(sol.status, CpStatus::Optimal);
        assert_eq!(sol.int_value(jobs[0].start), 15);
        assert_eq!(sol.objective, 15);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let windows = [(0, 10, 40), (20, 30, 40), (15, 15, 30), (60, 90, 20), (5, 5, 25)];
        let (m, _) = jobs_model(&windows, 2, 500, 10);
        let one = BranchAndBoundSolver::new().solve(&m, &config(1)).unwrap();
        let four = BranchAndBoundSolver::new()
            .solve(&m, &config(4).with_seed(42))
            .unwrap();

        assert_eq!(one.status, CpStatus::Optimal);
        assert_eq!(four.status, CpStatus::Optimal);
        assert_eq!(one.objective, four.objective);
    }

    #[test]
    fn test_zero_time_limit_on_large_tree() {
        let windows: Vec<(i64, i64, i64)> = (0..14).map(|i| (i * 5, i * 5, 40)).collect();
        let (m, _) = jobs_model(&windows, 3, 10_000, 10);
        let cfg = SolverConfig {
            time_limit: Duration::ZERO,
            ..config(1)
        };
        let sol = BranchAndBoundSolver::new().solve(&m, &cfg).unwrap();
        assert!(matches!(sol.status, CpStatus::Feasible | CpStatus::Unknown));
        assert_eq!(sol.stats.termination, TerminationReason::TimeLimit);
    }

    #[test]
    fn test_malformed_model_is_an_error() {
        let mut m = CpModel::new("bad", 10);
        let s = m.new_int_var(5, 1, "s");
        let b = m.new_bool_var("b");
        m.add_alternative("a", s, vec![], vec![b]);
        assert!(matches!(
            BranchAndBoundSolver::new().solve(&m, &config(1)),
            Err(ModelBuildError::EmptyDomain { .. })
        ));
    }
}
