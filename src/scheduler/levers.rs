//! Negotiation lever catalogue.
//!
//! When a flight ends up outsourced or uncovered, dispatch can go back to
//! the owner (or to the fleet) with a concrete ask. Each lever carries the
//! penalty the current policy would charge for it, so the cheapest asks
//! come first.

use serde::{Deserialize, Serialize};

use crate::models::{Flight, LeverPolicy};

/// Kind of negotiation lever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeverKind {
    /// Ask the owner to slide the departure later.
    OwnerShift { minutes: i64 },
    /// Widen the cheap flex band to the full negotiated cap.
    FlexBandExpansion,
    /// Move the leg to another tail of the same class.
    TailSwap,
    /// Fly a CJ leg on a LEG tail.
    ClassUpgrade,
    /// Accept an hour of empty ferry to reach the leg.
    Reposition,
    /// Broker the leg to a third party.
    Outsource,
}

/// One priced lever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverOption {
    pub kind: LeverKind,
    pub label: String,
    /// Objective cost of pulling the lever under the policy.
    pub penalty: i64,
    pub notes: String,
}

impl LeverOption {
    fn new(kind: LeverKind, label: &str, penalty: i64, notes: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            penalty,
            notes: notes.to_string(),
        }
    }

    /// Wording of the ask for a specific flight.
    pub fn ask(&self, flight: &Flight) -> String {
        match self.kind {
            LeverKind::OwnerShift { minutes } => format!(
                "Request owner {} to slide {} ETD +{}m",
                flight.owner_id, flight.id, minutes
            ),
            LeverKind::FlexBandExpansion => format!(
                "Request owner {} to accept the full flex band on {}",
                flight.owner_id, flight.id
            ),
            LeverKind::TailSwap => format!(
                "Swap {} among {} tails to free a contiguous block",
                flight.id, flight.fleet_class
            ),
            LeverKind::ClassUpgrade => format!("Fly {} on a larger-cabin tail", flight.id),
            LeverKind::Reposition => format!(
                "Ferry a {} tail to {} ahead of {}",
                flight.fleet_class, flight.origin, flight.id
            ),
            LeverKind::Outsource => format!("Broker {} {}-{}", flight.id, flight.origin, flight.dest),
        }
    }
}

/// Standard levers priced under `policy`, cheapest first.
///
/// Flex expansion is listed only when flex banding is on, class upgrade
/// only when upgrades are allowed. Equal penalties keep catalogue order.
pub fn lever_options(policy: &LeverPolicy) -> Vec<LeverOption> {
    let mut options = vec![
        LeverOption::new(
            LeverKind::OwnerShift { minutes: 30 },
            "Owner shift +30m",
            policy.cost_per_min_shift * 30,
            "Often unlocks tight turnarounds with minimal impact.",
        ),
        LeverOption::new(
            LeverKind::OwnerShift { minutes: 60 },
            "Owner shift +60m",
            policy.cost_per_min_shift * 60,
            "Larger buffer to align tails without swaps.",
        ),
    ];

    if policy.flex_pax_enabled {
        // Priced as the premium of the widened minutes over the base rate.
        let widened = (policy.flex_pax_plus_cap - policy.flex_pax_base_cap).max(0);
        let premium = (policy.flex_pax_cost_extra - policy.flex_pax_cost_base).max(0);
        options.push(LeverOption::new(
            LeverKind::FlexBandExpansion,
            "Flex band expansion",
            premium * widened,
            "Uses the negotiated band beyond the cheap flex window.",
        ));
    }

    options.push(LeverOption::new(
        LeverKind::TailSwap,
        "Tail swap within class",
        policy.tail_swap_cost,
        "No owner impact; may add one empty reposition leg.",
    ));

    if policy.allow_class_upgrade {
        options.push(LeverOption::new(
            LeverKind::ClassUpgrade,
            "Class upgrade",
            policy.class_upgrade_cost,
            "Owner flies a larger cabin at no extra charge.",
        ));
    }

    options.push(LeverOption::new(
        LeverKind::Reposition,
        "Reposition hour",
        policy.reposition_cost_per_min * 60,
        "Positions a spare tail at the departure airport.",
    ));
    options.push(LeverOption::new(
        LeverKind::Outsource,
        "Outsource leg",
        policy.outsource_cost,
        "Zero internal perturbation; highest direct cost.",
    ));

    options.sort_by_key(|o| o.penalty);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let options = lever_options(&LeverPolicy::default());
        let penalties: Vec<i64> = options.iter().map(|o| o.penalty).collect();
        assert_eq!(penalties, vec![60, 120, 120, 1_200, 1_800]);

        // +60m and a reposition hour tie; catalogue order holds.
        assert_eq!(options[1].kind, LeverKind::OwnerShift { minutes: 60 });
        assert_eq!(options[2].kind, LeverKind::Reposition);
        assert!(!options.iter().any(|o| o.kind == LeverKind::FlexBandExpansion));
        assert!(!options.iter().any(|o| o.kind == LeverKind::ClassUpgrade));
    }

    #[test]
    fn test_optional_levers() {
        let policy = LeverPolicy::default()
            .with_flex_pax(60, 30, 20, 1, 10)
            .with_class_upgrade(600);
        let options = lever_options(&policy);

        let flex = options
            .iter()
            .find(|o| o.kind == LeverKind::FlexBandExpansion)
            .unwrap();
        assert_eq!(flex.penalty, (10 - 1) * 40);
        assert!(options.iter().any(|o| o.kind == LeverKind::ClassUpgrade));
        assert!(options.windows(2).all(|w| w[0].penalty <= w[1].penalty));
    }

    #[test]
    fn test_flex_lever_free_when_rates_match() {
        let policy = LeverPolicy::default().with_flex_pax(60, 30, 20, 5, 5);
        let options = lever_options(&policy);
        assert_eq!(options[0].kind, LeverKind::FlexBandExpansion);
        assert_eq!(options[0].penalty, 0);
    }

    #[test]
    fn test_ask_wording() {
        let flight = Flight::new("F2", "CYVR", "KSEA", 45, "CJ", "O220").at(555);
        let options = lever_options(&LeverPolicy::default());
        assert_eq!(options[0].ask(&flight), "Request owner O220 to slide F2 ETD +30m");
        assert_eq!(options.last().unwrap().ask(&flight), "Broker F2 CYVR-KSEA");
    }
}
