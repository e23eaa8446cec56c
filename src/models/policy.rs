//! Lever policy.
//!
//! Every cost and cap the model uses comes from here. A policy is supplied
//! once per solve and can be loaded from JSON; missing keys fall back to
//! the production defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Longest accepted planning horizon (one week).
///
/// Start prices are tabulated per minute, so the horizon bounds both the
/// memory and the time of a solve.
pub const MAX_HORIZON_MIN: i64 = 7 * 24 * 60;

/// Adjustable costs and bounds for negotiation levers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverPolicy {
    /// Global cap on shifting after the window. Flight caps only tighten it.
    pub max_shift_plus_min: i64,
    /// Global cap on shifting before the window.
    pub max_shift_minus_min: i64,
    /// Base rate per shifted minute.
    pub cost_per_min_shift: i64,
    /// Minimum ground time between two legs on one tail.
    pub turn_min: i64,
    /// Cost of selling a leg to an outside operator.
    pub outsource_cost: i64,
    /// Cost of leaving a must-cover leg without any disposition.
    pub unassigned_penalty: i64,
    /// Cost of flying a leg on a tail other than its current one.
    pub tail_swap_cost: i64,
    /// Cost per ferry minute between consecutive legs.
    pub reposition_cost_per_min: i64,
    /// Enables the two-tier flex-PAX shift bands.
    pub flex_pax_enabled: bool,
    /// Outer bound of the flex bands after the window.
    pub flex_pax_plus_cap: i64,
    /// Outer bound of the flex bands before the window.
    pub flex_pax_minus_cap: i64,
    /// Boundary between the cheap and the expensive band.
    pub flex_pax_base_cap: i64,
    /// Rate inside the cheap band.
    pub flex_pax_cost_base: i64,
    /// Rate beyond the cheap band.
    pub flex_pax_cost_extra: i64,
    /// Whether optional positioning legs may be dropped.
    pub allow_pos_skips: bool,
    /// Cost of dropping an optional positioning leg.
    pub pos_skip_cost: i64,
    /// Whether a CJ leg may fly on a LEG tail.
    pub allow_class_upgrade: bool,
    /// Cost of a class upgrade.
    pub class_upgrade_cost: i64,
    /// Planning horizon length in minutes.
    pub horizon_min: i64,
}

impl Default for LeverPolicy {
    fn default() -> Self {
        Self {
            max_shift_plus_min: 90,
            max_shift_minus_min: 30,
            cost_per_min_shift: 2,
            turn_min: 30,
            outsource_cost: 1_800,
            unassigned_penalty: 5_000,
            tail_swap_cost: 1_200,
            reposition_cost_per_min: 2,
            flex_pax_enabled: false,
            flex_pax_plus_cap: 60,
            flex_pax_minus_cap: 30,
            flex_pax_base_cap: 20,
            flex_pax_cost_base: 1,
            flex_pax_cost_extra: 10,
            allow_pos_skips: true,
            pos_skip_cost: 5_000,
            allow_class_upgrade: false,
            class_upgrade_cost: 600,
            horizon_min: 24 * 60,
        }
    }
}

impl LeverPolicy {
    /// Sets the global shift caps.
    pub fn with_shift_caps(mut self, plus: i64, minus: i64) -> Self {
        self.max_shift_plus_min = plus;
        self.max_shift_minus_min = minus;
        self
    }

    /// Sets the turn buffer.
    pub fn with_turn(mut self, turn_min: i64) -> Self {
        self.turn_min = turn_min;
        self
    }

    /// Enables flex-PAX banding.
    pub fn with_flex_pax(
        mut self,
        plus_cap: i64,
        minus_cap: i64,
        base_cap: i64,
        cost_base: i64,
        cost_extra: i64,
    ) -> Self {
        self.flex_pax_enabled = true;
        self.flex_pax_plus_cap = plus_cap;
        self.flex_pax_minus_cap = minus_cap;
        self.flex_pax_base_cap = base_cap;
        self.flex_pax_cost_base = cost_base;
        self.flex_pax_cost_extra = cost_extra;
        self
    }

    /// Allows CJ legs on LEG tails at the given cost.
    pub fn with_class_upgrade(mut self, cost: i64) -> Self {
        self.allow_class_upgrade = true;
        self.class_upgrade_cost = cost;
        self
    }

    /// Sets the planning horizon.
    pub fn with_horizon(mut self, horizon_min: i64) -> Self {
        self.horizon_min = horizon_min;
        self
    }

    /// Checks that every cost and cap is usable. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let fields = [
            ("max_shift_plus_min", self.max_shift_plus_min),
            ("max_shift_minus_min", self.max_shift_minus_min),
            ("cost_per_min_shift", self.cost_per_min_shift),
            ("turn_min", self.turn_min),
            ("outsource_cost", self.outsource_cost),
            ("unassigned_penalty", self.unassigned_penalty),
            ("tail_swap_cost", self.tail_swap_cost),
            ("reposition_cost_per_min", self.reposition_cost_per_min),
            ("flex_pax_plus_cap", self.flex_pax_plus_cap),
            ("flex_pax_minus_cap", self.flex_pax_minus_cap),
            ("flex_pax_base_cap", self.flex_pax_base_cap),
            ("flex_pax_cost_base", self.flex_pax_cost_base),
            ("flex_pax_cost_extra", self.flex_pax_cost_extra),
            ("pos_skip_cost", self.pos_skip_cost),
            ("class_upgrade_cost", self.class_upgrade_cost),
        ];
        for (field, value) in fields {
            if value < 0 {
                return Err(ConfigurationError::NegativePolicy { field, value });
            }
        }

        if self.horizon_min <= 0 {
            return Err(ConfigurationError::NonPositiveHorizon(self.horizon_min));
        }
        if self.horizon_min > MAX_HORIZON_MIN {
            return Err(ConfigurationError::HorizonTooLong {
                value: self.horizon_min,
                max: MAX_HORIZON_MIN,
            });
        }

        if self.flex_pax_enabled {
            for (field, cap) in [
                ("flex_pax_plus_cap", self.flex_pax_plus_cap),
                ("flex_pax_minus_cap", self.flex_pax_minus_cap),
            ] {
                if self.flex_pax_base_cap > cap {
                    return Err(ConfigurationError::FlexBaseExceedsCap {
                        base: self.flex_pax_base_cap,
                        field,
                        cap,
                    });
                }
            }
        }

        Ok(())
    }
}
