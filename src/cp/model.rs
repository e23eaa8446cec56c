//! Constraint model vocabulary.
//!
//! A small scheduling-oriented CP language in the style of interval-based
//! solvers: variables live in arenas and are referred to by typed indices,
//! constraints refer to those indices only.
//!
//! | Element | Meaning |
//! |---------|---------|
//! | `BoolVar` / `IntVar` | decision variables with a bounded domain |
//! | `IntervalVar` | optional `[start, start + size)` tied to a presence literal |
//! | `SoftWindow` | `start ≥ earliest − Σ early` and `start ≤ latest + Σ late` |
//! | `Alternative` | exactly one of its interval presences / fallback literals |
//! | `Sequence` | no-overlap over intervals with transition gaps and charges |
//! | `NoGood` | forbids a conjunction of literal/start-range terms |
//!
//! The objective is a non-negative weighted sum of variable values plus the
//! transition charges actually incurred on each sequence.
//!
//! # Reference
//! Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

use crate::error::ModelBuildError;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Position in the owning arena.
            pub fn index(self) -> usize {
                self.0
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index)
            }
        }
    };
}

arena_id!(
    /// Handle of a boolean variable.
    BoolVarId
);
arena_id!(
    /// Handle of an integer variable.
    IntVarId
);
arena_id!(
    /// Handle of an interval variable.
    IntervalId
);
arena_id!(
    /// Handle of a sequence (no-overlap resource).
    SequenceId
);

/// A boolean decision variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolVar {
    pub name: String,
}

/// An integer decision variable with domain `[lb, ub]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVar {
    pub name: String,
    pub lb: i64,
    pub ub: i64,
}

/// An optional interval of fixed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalVar {
    pub name: String,
    /// Start variable; may be shared by several alternative intervals.
    pub start: IntVarId,
    pub size: i64,
    /// The interval exists iff this literal is true.
    pub presence: BoolVarId,
    /// Earliest start when present.
    pub start_min: i64,
    /// Latest end when present.
    pub end_max: i64,
}

/// A window on a start variable, softened by slack bands.
///
/// Enforces `start ≥ earliest − Σ early` and `start ≤ latest + Σ late`.
/// Slack variables are non-negative and layered: each band on a side is
/// filled before the next one takes any slack. Their objective
/// coefficients price each band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftWindow {
    pub start: IntVarId,
    pub earliest: i64,
    pub latest: i64,
    pub early: Vec<IntVarId>,
    pub late: Vec<IntVarId>,
}

/// Exactly one of the listed intervals or fallback literals is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub name: String,
    /// Start variable shared by every interval of the alternative.
    pub start: IntVarId,
    pub intervals: Vec<IntervalId>,
    pub fallbacks: Vec<BoolVarId>,
}

/// A unary resource: present member intervals never overlap.
///
/// Members are addressed by their local position in `intervals`. Between
/// consecutive members `a → b`, `start_b ≥ end_a + gap(a, b)`. The member
/// sequenced first must start no earlier than `first_start[a]`. Each
/// consecutive pair adds `charge(a, b) × charge_weight` to the objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub intervals: Vec<IntervalId>,
    pub first_start: Vec<i64>,
    /// Row-major `len × len`.
    pub transition_gap: Vec<i64>,
    /// Row-major `len × len`.
    pub transition_charge: Vec<i64>,
    pub charge_weight: i64,
}

impl Sequence {
    /// Creates a sequence with no gaps, charges or first-start limits.
    pub fn new(name: impl Into<String>, intervals: Vec<IntervalId>) -> Self {
        let n = intervals.len();
        Self {
            name: name.into(),
            intervals,
            first_start: vec![0; n],
            transition_gap: vec![0; n * n],
            transition_charge: vec![0; n * n],
            charge_weight: 0,
        }
    }

    /// Number of member intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the sequence has no members.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Minimum gap between local members `a → b`.
    pub fn gap(&self, a: usize, b: usize) -> i64 {
        self.transition_gap[a * self.len() + b]
    }

    /// Charged minutes between local members `a → b`.
    pub fn charge(&self, a: usize, b: usize) -> i64 {
        self.transition_charge[a * self.len() + b]
    }

    /// Local position of an interval, if it is a member.
    pub fn local_index(&self, interval: IntervalId) -> Option<usize> {
        self.intervals.iter().position(|&i| i == interval)
    }
}

/// One term of a no-good: the literal is true and, if given, the start
/// variable lies in the inclusive range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoGoodTerm {
    pub literal: BoolVarId,
    pub start: Option<(IntVarId, i64, i64)>,
}

/// Forbids every term holding at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoGood {
    pub terms: Vec<NoGoodTerm>,
}

/// A constraint model instance. Built once per solve call.
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    horizon: i64,
    bools: Vec<BoolVar>,
    ints: Vec<IntVar>,
    intervals: Vec<IntervalVar>,
    windows: Vec<SoftWindow>,
    alternatives: Vec<Alternative>,
    sequences: Vec<Sequence>,
    no_goods: Vec<NoGood>,
    bool_costs: Vec<i64>,
    int_costs: Vec<i64>,
}

impl CpModel {
    /// Creates an empty model over `[0, horizon]`.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            bools: Vec::new(),
            ints: Vec::new(),
            intervals: Vec::new(),
            windows: Vec::new(),
            alternatives: Vec::new(),
            sequences: Vec::new(),
            no_goods: Vec::new(),
            bool_costs: Vec::new(),
            int_costs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// Adds a boolean variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVarId {
        self.bools.push(BoolVar { name: name.into() });
        self.bool_costs.push(0);
        BoolVarId(self.bools.len() - 1)
    }

    /// Adds an integer variable with domain `[lb, ub]`.
    pub fn new_int_var(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> IntVarId {
        self.ints.push(IntVar {
            name: name.into(),
            lb,
            ub,
        });
        self.int_costs.push(0);
        IntVarId(self.ints.len() - 1)
    }

    /// Adds an optional interval.
    pub fn new_optional_interval(
        &mut self,
        name: impl Into<String>,
        start: IntVarId,
        size: i64,
        presence: BoolVarId,
        start_min: i64,
        end_max: i64,
    ) -> IntervalId {
        self.intervals.push(IntervalVar {
            name: name.into(),
            start,
            size,
            presence,
            start_min,
            end_max,
        });
        IntervalId(self.intervals.len() - 1)
    }

    /// Adds a soft window constraint.
    pub fn add_soft_window(&mut self, window: SoftWindow) {
        self.windows.push(window);
    }

    /// Adds an exactly-one alternative.
    pub fn add_alternative(
        &mut self,
        name: impl Into<String>,
        start: IntVarId,
        intervals: Vec<IntervalId>,
        fallbacks: Vec<BoolVarId>,
    ) {
        self.alternatives.push(Alternative {
            name: name.into(),
            start,
            intervals,
            fallbacks,
        });
    }

    /// Adds a no-overlap sequence.
    pub fn add_sequence(&mut self, sequence: Sequence) -> SequenceId {
        self.sequences.push(sequence);
        SequenceId(self.sequences.len() - 1)
    }

    /// Adds a no-good.
    pub fn add_no_good(&mut self, no_good: NoGood) {
        self.no_goods.push(no_good);
    }

    /// Adds `coef × var` to the objective.
    pub fn add_bool_cost(&mut self, var: BoolVarId, coef: i64) {
        if let Some(c) = self.bool_costs.get_mut(var.0) {
            *c += coef;
        }
    }

    /// Adds `coef × var` to the objective.
    pub fn add_int_cost(&mut self, var: IntVarId, coef: i64) {
        if let Some(c) = self.int_costs.get_mut(var.0) {
            *c += coef;
        }
    }

    pub fn bool_var(&self, id: BoolVarId) -> &BoolVar {
        &self.bools[id.0]
    }

    pub fn int_var(&self, id: IntVarId) -> &IntVar {
        &self.ints[id.0]
    }

    pub fn interval(&self, id: IntervalId) -> &IntervalVar {
        &self.intervals[id.0]
    }

    pub fn sequence(&self, id: SequenceId) -> &Sequence {
        &self.sequences[id.0]
    }

    pub fn windows(&self) -> &[SoftWindow] {
        &self.windows
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn no_goods(&self) -> &[NoGood] {
        &self.no_goods
    }

    /// Objective coefficient of a boolean variable.
    pub fn bool_cost(&self, id: BoolVarId) -> i64 {
        self.bool_costs[id.0]
    }

    /// Objective coefficient of an integer variable.
    pub fn int_cost(&self, id: IntVarId) -> i64 {
        self.int_costs[id.0]
    }

    pub fn bool_count(&self) -> usize {
        self.bools.len()
    }

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of posted constraints of every kind.
    pub fn constraint_count(&self) -> usize {
        self.windows.len() + self.alternatives.len() + self.sequences.len() + self.no_goods.len()
    }

    /// Objective value of a full assignment.
    ///
    /// `orders[s]` lists the present intervals of sequence `s` in
    /// execution order.
    pub fn objective_value(
        &self,
        bool_values: &[bool],
        int_values: &[i64],
        orders: &[Vec<IntervalId>],
    ) -> i64 {
        let bools: i64 = self
            .bool_costs
            .iter()
            .zip(bool_values)
            .filter(|(_, &v)| v)
            .map(|(c, _)| *c)
            .sum();
        let ints: i64 = self
            .int_costs
            .iter()
            .zip(int_values)
            .map(|(c, v)| c * v)
            .sum();
        let charges: i64 = self
            .sequences
            .iter()
            .zip(orders)
            .map(|(seq, order)| {
                let locals: Vec<usize> = order.iter().filter_map(|&i| seq.local_index(i)).collect();
                locals
                    .windows(2)
                    .map(|w| seq.charge(w[0], w[1]) * seq.charge_weight)
                    .sum::<i64>()
            })
            .sum();
        bools + ints + charges
    }

    /// Verifies that the model is wired consistently.
    ///
    /// Every interval must belong to exactly one alternative, share its
    /// start, and sit in at most one sequence. Domains must be non-empty
    /// and objective coefficients non-negative.
    pub fn check(&self) -> Result<(), ModelBuildError> {
        for var in &self.ints {
            if var.lb > var.ub {
                return Err(ModelBuildError::EmptyDomain {
                    name: var.name.clone(),
                    lb: var.lb,
                    ub: var.ub,
                });
            }
        }

        for (i, &c) in self.bool_costs.iter().enumerate() {
            if c < 0 {
                return Err(ModelBuildError::NegativeCost(self.bools[i].name.clone()));
            }
        }
        for (i, &c) in self.int_costs.iter().enumerate() {
            if c < 0 {
                return Err(ModelBuildError::NegativeCost(self.ints[i].name.clone()));
            }
        }

        for interval in &self.intervals {
            self.check_int(interval.start)?;
            self.check_bool(interval.presence)?;
        }

        for window in &self.windows {
            self.check_int(window.start)?;
            for &v in window.early.iter().chain(&window.late) {
                self.check_int(v)?;
                if self.ints[v.0].lb < 0 {
                    return Err(ModelBuildError::EmptyDomain {
                        name: self.ints[v.0].name.clone(),
                        lb: self.ints[v.0].lb,
                        ub: self.ints[v.0].ub,
                    });
                }
            }
        }

        let mut owners = vec![0usize; self.intervals.len()];
        for alt in &self.alternatives {
            self.check_int(alt.start)?;
            if alt.intervals.is_empty() && alt.fallbacks.is_empty() {
                return Err(ModelBuildError::EmptyAlternative(alt.name.clone()));
            }
            for &iv in &alt.intervals {
                self.check_interval(iv)?;
                if self.intervals[iv.0].start != alt.start {
                    return Err(ModelBuildError::UnboundInterval(
                        self.intervals[iv.0].name.clone(),
                    ));
                }
                owners[iv.0] += 1;
            }
            for &b in &alt.fallbacks {
                self.check_bool(b)?;
            }
        }
        if let Some(pos) = owners.iter().position(|&n| n != 1) {
            return Err(ModelBuildError::UnboundInterval(
                self.intervals[pos].name.clone(),
            ));
        }

        let mut seq_members = vec![0usize; self.intervals.len()];
        for seq in &self.sequences {
            let n = seq.len();
            for &iv in &seq.intervals {
                self.check_interval(iv)?;
                seq_members[iv.0] += 1;
            }
            for (actual, expected) in [
                (seq.transition_gap.len(), n * n),
                (seq.transition_charge.len(), n * n),
                (seq.first_start.len(), n),
            ] {
                if actual != expected {
                    return Err(ModelBuildError::TransitionSize {
                        name: seq.name.clone(),
                        expected: n,
                        actual,
                    });
                }
            }
        }
        if let Some(pos) = seq_members.iter().position(|&n| n > 1) {
            return Err(ModelBuildError::UnboundInterval(
                self.intervals[pos].name.clone(),
            ));
        }

        for no_good in &self.no_goods {
            for term in &no_good.terms {
                self.check_bool(term.literal)?;
                if let Some((v, _, _)) = term.start {
                    self.check_int(v)?;
                }
            }
        }

        Ok(())
    }

    fn check_int(&self, id: IntVarId) -> Result<(), ModelBuildError> {
        if id.0 < self.ints.len() {
            Ok(())
        } else {
            Err(ModelBuildError::UnknownVariable {
                kind: "int",
                index: id.0,
            })
        }
    }

    fn check_bool(&self, id: BoolVarId) -> Result<(), ModelBuildError> {
        if id.0 < self.bools.len() {
            Ok(())
        } else {
            Err(ModelBuildError::UnknownVariable {
                kind: "bool",
                index: id.0,
            })
        }
    }

    fn check_interval(&self, id: IntervalId) -> Result<(), ModelBuildError> {
        if id.0 < self.intervals.len() {
            Ok(())
        } else {
            Err(ModelBuildError::UnknownVariable {
                kind: "interval",
                index: id.0,
            })
        }
    }
}
