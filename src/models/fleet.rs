//! Fleet-class buckets.
//!
//! Operators spell aircraft types many ways ("CJ3", "cj4", "E545",
//! "Legacy 450"). Everything downstream compares normalized buckets only,
//! so normalization happens once when an entity is constructed.

/// Citation jets.
pub const CLASS_CJ: &str = "CJ";
/// Embraer Legacy / Praetor family.
pub const CLASS_LEG: &str = "LEG";

/// Collapses fleet-class variants into a shared compatibility bucket.
///
/// - prefix `CJ` → `CJ`
/// - prefix `LEG` or `E` → `LEG`
/// - `GEN` → `GEN`
/// - anything else is upper-cased and kept as is
pub fn normalize_fleet_class(raw: &str) -> String {
    let value = raw.trim().to_uppercase();
    if value.starts_with(CLASS_CJ) {
        CLASS_CJ.to_string()
    } else if value.starts_with(CLASS_LEG) || value.starts_with('E') {
        CLASS_LEG.to_string()
    } else {
        value
    }
}

/// How a flight of one class may be served by a tail of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFit {
    /// Same bucket.
    Exact,
    /// Larger cabin serving a smaller-cabin request (CJ on LEG).
    Upgrade,
    /// Not servable.
    Incompatible,
}

/// Classifies a flight/tail pairing. Inputs must already be normalized.
pub fn class_fit(flight_class: &str, tail_class: &str) -> ClassFit {
    if flight_class == tail_class {
        ClassFit::Exact
    } else if flight_class == CLASS_CJ && tail_class == CLASS_LEG {
        ClassFit::Upgrade
    } else {
        ClassFit::Incompatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_fleet_class("cj3"), "CJ");
        assert_eq!(normalize_fleet_class(" CJ4 "), "CJ");
        assert_eq!(normalize_fleet_class("Legacy 450"), "LEG");
        assert_eq!(normalize_fleet_class("E545"), "LEG");
        assert_eq!(normalize_fleet_class("gen"), "GEN");
        assert_eq!(normalize_fleet_class("pc12"), "PC12");
        assert_eq!(normalize_fleet_class(""), "");
    }

    #[test]
    fn test_class_fit() {
        assert_eq!(class_fit("CJ", "CJ"), ClassFit::Exact);
        assert_eq!(class_fit("CJ", "LEG"), ClassFit::Upgrade);
        assert_eq!(class_fit("LEG", "CJ"), ClassFit::Incompatible);
        assert_eq!(class_fit("GEN", "LEG"), ClassFit::Incompatible);
    }
}
