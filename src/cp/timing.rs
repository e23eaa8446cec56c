//! Exact start-time placement for a fixed order of intervals.
//!
//! Once the members of a sequence and their order are fixed, the cheapest
//! start times follow from a dynamic program over integer minutes:
//!
//! ```text
//! f₀(s)   = price₀(s)                         s ≥ first_start
//! fₖ(s)   = priceₖ(s) + min { fₖ₋₁(t) : t ≤ s − sizeₖ₋₁ − gapₖ₋₁ }
//! ```
//!
//! Prefix minima make each row linear in the horizon, so one evaluation
//! costs `O(n · H)`. Ties resolve to the earliest start.

use super::model::IntVarId;

/// Cost marking an unreachable start.
pub(crate) const INFEASIBLE: i64 = i64::MAX / 4;

/// One slack band of a soft window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Band {
    pub var: IntVarId,
    pub cap: i64,
    pub coef: i64,
}

/// Pricing of a start variable under a soft window.
///
/// Bands on each side are filled in declaration order: a band takes slack
/// only once every earlier band is at its cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowPrice {
    pub earliest: i64,
    pub latest: i64,
    pub early: Vec<Band>,
    pub late: Vec<Band>,
}

impl WindowPrice {
    pub fn new(earliest: i64, latest: i64, early: Vec<Band>, late: Vec<Band>) -> Self {
        Self {
            earliest,
            latest,
            early,
            late,
        }
    }

    /// Slack cost for `start`, or `None` if the bands run out.
    pub fn cost(&self, start: i64) -> Option<i64> {
        if start < self.earliest {
            fill_cost(&self.early, self.earliest - start)
        } else if start > self.latest {
            fill_cost(&self.late, start - self.latest)
        } else {
            Some(0)
        }
    }

    /// Writes the band values realizing [`WindowPrice::cost`] into `ints`.
    pub fn assign(&self, start: i64, ints: &mut [i64]) {
        for band in self.early.iter().chain(&self.late) {
            ints[band.var.index()] = 0;
        }
        if start < self.earliest {
            fill_values(&self.early, self.earliest - start, ints);
        } else if start > self.latest {
            fill_values(&self.late, start - self.latest, ints);
        }
    }
}

fn fill_cost(bands: &[Band], mut deficit: i64) -> Option<i64> {
    let mut cost = 0;
    for band in bands {
        if deficit == 0 {
            break;
        }
        let take = band.cap.min(deficit);
        cost += take * band.coef;
        deficit -= take;
    }
    (deficit == 0).then_some(cost)
}

fn fill_values(bands: &[Band], mut deficit: i64, ints: &mut [i64]) {
    for band in bands {
        let take = band.cap.min(deficit);
        ints[band.var.index()] = take;
        deficit -= take;
    }
}

/// Price of every start minute in `[0, span]`.
///
/// Minutes outside `[lb, ub]` or beyond some window's bands are
/// [`INFEASIBLE`].
pub(crate) fn price_profile(windows: &[WindowPrice], lb: i64, ub: i64, span: i64) -> Vec<i64> {
    (0..=span)
        .map(|s| {
            if s < lb || s > ub {
                return INFEASIBLE;
            }
            windows
                .iter()
                .try_fold(0i64, |acc, w| w.cost(s).map(|c| acc + c))
                .unwrap_or(INFEASIBLE)
        })
        .collect()
}

/// One member of a fixed order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<'a> {
    pub size: i64,
    pub lo: i64,
    pub hi: i64,
    /// Indexed by start minute, `span + 1` long.
    pub profile: &'a [i64],
}

/// Reusable DP tables.
#[derive(Debug, Clone)]
pub(crate) struct TimingTable {
    width: usize,
    best: Vec<i64>,
    arg: Vec<usize>,
}

impl TimingTable {
    pub fn new(span: i64) -> Self {
        Self {
            width: span.max(0) as usize + 1,
            best: Vec::new(),
            arg: Vec::new(),
        }
    }

    /// Minimum total price of `slots` in order, or `None` if no timing
    /// satisfies the gaps, windows and bounds.
    ///
    /// `gaps[k]` is the required idle time between slot `k` and `k + 1`.
    pub fn min_cost(&mut self, slots: &[Slot<'_>], first_start: i64, gaps: &[i64]) -> Option<i64> {
        if slots.is_empty() {
            return Some(0);
        }
        self.fill(slots, first_start, gaps)?;
        let last = (slots.len() - 1) * self.width + self.width - 1;
        Some(self.best[last])
    }

    /// Like [`TimingTable::min_cost`], also returning the start of each slot.
    pub fn solve(
        &mut self,
        slots: &[Slot<'_>],
        first_start: i64,
        gaps: &[i64],
    ) -> Option<(i64, Vec<i64>)> {
        let cost = self.min_cost(slots, first_start, gaps)?;
        let n = slots.len();
        let mut starts = vec![0i64; n];
        if n == 0 {
            return Some((cost, starts));
        }

        let w = self.width;
        starts[n - 1] = self.arg[(n - 1) * w + w - 1] as i64;
        for k in (0..n - 1).rev() {
            let limit = starts[k + 1] - slots[k].size - gaps[k];
            starts[k] = self.arg[k * w + limit as usize] as i64;
        }
        Some((cost, starts))
    }

    fn fill(&mut self, slots: &[Slot<'_>], first_start: i64, gaps: &[i64]) -> Option<()> {
        let w = self.width;
        let n = slots.len();
        if self.best.len() < n * w {
            self.best.resize(n * w, INFEASIBLE);
            self.arg.resize(n * w, 0);
        }

        for (k, slot) in slots.iter().enumerate() {
            let floor = if k == 0 { first_start.max(0) } else { 0 };
            let lo = slot.lo.max(floor);
            let hi = slot.hi.min(w as i64 - 1);
            let offset = if k > 0 {
                slots[k - 1].size + gaps[k - 1]
            } else {
                0
            };

            let mut run_val = INFEASIBLE;
            let mut run_arg = 0usize;
            let row = k * w;
            for s in 0..w {
                let si = s as i64;
                let mut value = INFEASIBLE;
                if si >= lo && si <= hi && slot.profile[s] < INFEASIBLE {
                    if k == 0 {
                        value = slot.profile[s];
                    } else {
                        let t = si - offset;
                        if t >= 0 {
                            let prev = self.best[row - w + t as usize];
                            if prev < INFEASIBLE {
                                value = prev + slot.profile[s];
                            }
                        }
                    }
                }
                if value < run_val {
                    run_val = value;
                    run_arg = s;
                }
                self.best[row + s] = run_val;
                self.arg[row + s] = run_arg;
            }

            if run_val >= INFEASIBLE {
                return None;
            }
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::CpModel;

    fn bands(model: &mut CpModel, caps: &[(i64, i64)]) -> Vec<Band> {
        caps.iter()
            .enumerate()
            .map(|(i, &(cap, coef))| Band {
                var: model.new_int_var(0, cap, format!("b{i}")),
                cap,
                coef,
            })
            .collect()
    }

    #[test]
    fn test_window_fills_bands_in_order() {
        let mut m = CpModel::new("t", 100);
        let late = bands(&mut m, &[(20, 1), (30, 10)]);
        let w = WindowPrice::new(10, 20, vec![], late);

        assert_eq!(w.cost(15), Some(0));
        assert_eq!(w.cost(30), Some(10));
        assert_eq!(w.cost(60), Some(20 + 20 * 10));
        assert_eq!(w.cost(71), None);
        assert_eq!(w.cost(5), None);

        let mut ints = vec![0; m.int_count()];
        w.assign(60, &mut ints);
        assert_eq!(ints, vec![20, 20]);
    }

    #[test]
    fn test_expensive_first_band_is_still_filled_first() {
        let mut m = CpModel::new("t", 100);
        let late = bands(&mut m, &[(20, 20), (40, 10)]);
        let w = WindowPrice::new(0, 0, vec![], late);

        assert_eq!(w.cost(30), Some(20 * 20 + 10 * 10));
        let mut ints = vec![0; m.int_count()];
        w.assign(30, &mut ints);
        assert_eq!(ints, vec![20, 10]);
    }

    #[test]
    fn test_profile_respects_domain() {
        let mut m = CpModel::new("t", 10);
        let early = bands(&mut m, &[(2, 3)]);
        let w = WindowPrice::new(5, 6, early, vec![]);
        let p = price_profile(&[w], 0, 8, 10);
        assert_eq!(p.len(), 11);
        assert_eq!(p[2], INFEASIBLE);
        assert_eq!(p[3], 6);
        assert_eq!(p[4], 3);
        assert_eq!(p[6], 0);
        assert_eq!(p[7], INFEASIBLE);
        assert_eq!(p[9], INFEASIBLE);
    }

    #[test]
    fn test_two_slots_share_the_push() {
        // Both want to start at 10; the second needs 10 + 5 + 5.
        let flat: Vec<i64> = (0..=50).map(|s: i64| (s - 10).abs()).collect();
        let steep: Vec<i64> = (0..=50).map(|s: i64| 3 * (s - 10).abs()).collect();
        let slots = [
            Slot { size: 5, lo: 0, hi: 50, profile: &flat },
            Slot { size: 5, lo: 0, hi: 50, profile: &steep },
        ];
        let mut table = TimingTable::new(50);
        let (cost, starts) = table.solve(&slots, 0, &[5]).unwrap();
        // Cheaper to move the flat slot earlier than to delay the steep one.
        assert_eq!(starts, vec![0, 10]);
        assert_eq!(cost, 10);
    }

    #[test]
    fn test_first_start_and_infeasible_gap() {
        let zero = vec![0i64; 31];
        let slots = [
            Slot { size: 10, lo: 0, hi: 30, profile: &zero },
            Slot { size: 10, lo: 0, hi: 15, profile: &zero },
        ];
        let mut table = TimingTable::new(30);
        let (_, starts) = table.solve(&slots, 4, &[0]).unwrap();
        assert_eq!(starts, vec![4, 14]);

        assert_eq!(table.min_cost(&slots, 6, &[0]), None);
        assert_eq!(table.min_cost(&slots, 0, &[20]), None);
        assert_eq!(table.min_cost(&[], 0, &[]), Some(0));
    }
}
