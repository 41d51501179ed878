//! Medicine catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry for a medicine stocked by the pharmacy.
///
/// Catalog entries are never deleted, only deactivated, so batch line items
/// always point at a valid id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub manufacturer: String,
    /// Threshold below which the summed finalized stock counts as low.
    pub reorder_level: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Low-stock test: strictly below the reorder threshold.
///
/// A medicine with no stock and a zero threshold is not low.
pub fn is_low_stock(in_stock: i64, reorder_level: i64) -> bool {
    in_stock < reorder_level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_low() {
        assert!(is_low_stock(49, 50));
        assert!(is_low_stock(0, 1));
    }

    #[test]
    fn at_or_above_threshold_is_not_low() {
        assert!(!is_low_stock(50, 50));
        assert!(!is_low_stock(51, 50));
    }

    #[test]
    fn zero_threshold_never_low() {
        assert!(!is_low_stock(0, 0));
    }
}
