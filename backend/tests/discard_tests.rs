//! Discard workflow tests
//!
//! Tests for the FIFO-by-expiry allocation planner:
//! - Earliest-expiring stock is consumed first
//! - Per-batch contributions are clamped to availability
//! - The plan is all-or-nothing when stock is insufficient

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{plan_discard, DiscardCandidate, DiscardPlanError};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn candidate(number: &str, expiry: NaiveDate, available: i64, price: Decimal) -> DiscardCandidate {
    DiscardCandidate {
        batch_id: Uuid::new_v4(),
        batch_number: number.to_string(),
        expiry_date: Some(expiry),
        available,
        price_per_unit: price,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_single_batch_partial_discard() {
        // One finalized batch with 100 units at 2.00; discard 30.
        let candidates = vec![candidate("B-001", day(2025, 8, 12), 100, dec("2"))];
        let allocations = plan_discard(&candidates, 30).unwrap();

        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].batch_number, "B-001");
        assert_eq!(allocations[0].quantity, 30);
        assert_eq!(allocations[0].total_value(), dec("60"));
    }

    #[test]
    fn test_earliest_expiry_consumed_first() {
        let candidates = vec![
            candidate("B-LATE", day(2026, 6, 1), 50, dec("1")),
            candidate("B-EARLY", day(2025, 9, 1), 50, dec("1")),
        ];
        let allocations = plan_discard(&candidates, 60).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].batch_number, "B-EARLY");
        assert_eq!(allocations[0].quantity, 50);
        assert_eq!(allocations[1].batch_number, "B-LATE");
        assert_eq!(allocations[1].quantity, 10);
    }

    #[test]
    fn test_exact_availability_consumed_fully() {
        let candidates = vec![
            candidate("B-1", day(2025, 9, 1), 20, dec("1")),
            candidate("B-2", day(2025, 10, 1), 30, dec("1")),
        ];
        let allocations = plan_discard(&candidates, 50).unwrap();

        let total: i64 = allocations.iter().map(|a| a.quantity).sum();
        assert_eq!(total, 50);
        assert_eq!(allocations.len(), 2);
    }

    #[test]
    fn test_insufficient_stock_fails_whole_plan() {
        let candidates = vec![
            candidate("B-1", day(2025, 9, 1), 20, dec("1")),
            candidate("B-2", day(2025, 10, 1), 30, dec("1")),
        ];
        let err = plan_discard(&candidates, 51).unwrap_err();
        assert_eq!(
            err,
            DiscardPlanError::InsufficientStock {
                requested: 51,
                available: 50
            }
        );
    }

    #[test]
    fn test_no_candidates_is_insufficient() {
        let err = plan_discard(&[], 1).unwrap_err();
        assert_eq!(
            err,
            DiscardPlanError::InsufficientStock {
                requested: 1,
                available: 0
            }
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let candidates = vec![candidate("B-1", day(2025, 9, 1), 20, dec("1"))];
        assert_eq!(
            plan_discard(&candidates, 0).unwrap_err(),
            DiscardPlanError::InvalidQuantity(0)
        );
    }

    #[test]
    fn test_empty_line_items_skipped() {
        // Fully discarded items stay in their batch at zero quantity but
        // contribute nothing to a later discard.
        let candidates = vec![
            candidate("B-EMPTY", day(2025, 8, 1), 0, dec("1")),
            candidate("B-STOCKED", day(2025, 9, 1), 10, dec("1")),
        ];
        let allocations = plan_discard(&candidates, 10).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].batch_number, "B-STOCKED");
    }

    #[test]
    fn test_tie_on_expiry_breaks_by_batch_number() {
        let expiry = day(2025, 9, 1);
        let candidates = vec![
            candidate("B-2", expiry, 10, dec("1")),
            candidate("B-1", expiry, 10, dec("1")),
        ];
        let allocations = plan_discard(&candidates, 15).unwrap();
        assert_eq!(allocations[0].batch_number, "B-1");
        assert_eq!(allocations[1].batch_number, "B-2");
    }

    #[test]
    fn test_missing_expiry_sorts_last() {
        let mut no_expiry = candidate("B-NODATE", day(2025, 1, 1), 10, dec("1"));
        no_expiry.expiry_date = None;
        let candidates = vec![no_expiry, candidate("B-DATED", day(2026, 1, 1), 10, dec("1"))];

        let allocations = plan_discard(&candidates, 15).unwrap();
        assert_eq!(allocations[0].batch_number, "B-DATED");
        assert_eq!(allocations[1].batch_number, "B-NODATE");
    }

    #[test]
    fn test_allocation_value_uses_batch_price() {
        let candidates = vec![
            candidate("B-CHEAP", day(2025, 9, 1), 10, dec("1.50")),
            candidate("B-DEAR", day(2025, 10, 1), 10, dec("3.00")),
        ];
        let allocations = plan_discard(&candidates, 15).unwrap();
        assert_eq!(allocations[0].total_value(), dec("15.00"));
        assert_eq!(allocations[1].total_value(), dec("15.00"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn candidates_strategy() -> impl Strategy<Value = Vec<DiscardCandidate>> {
        prop::collection::vec(
            (0i64..=500, 1i64..=365, 1i64..=10_000),
            1..10,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (available, expiry_offset, price_cents))| {
                    candidate(
                        &format!("B-{:03}", i),
                        day(2025, 1, 1) + chrono::Duration::days(expiry_offset),
                        available,
                        Decimal::new(price_cents, 2),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// When stock suffices, allocations sum exactly to the request
        #[test]
        fn prop_allocations_sum_to_request(
            candidates in candidates_strategy(),
            requested in 1i64..=1_000
        ) {
            let available: i64 = candidates.iter().map(|c| c.available).sum();
            match plan_discard(&candidates, requested) {
                Ok(allocations) => {
                    prop_assert!(available >= requested);
                    let total: i64 = allocations.iter().map(|a| a.quantity).sum();
                    prop_assert_eq!(total, requested);
                }
                Err(DiscardPlanError::InsufficientStock { available: reported, .. }) => {
                    prop_assert!(available < requested);
                    prop_assert_eq!(reported, available);
                }
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
            }
        }

        /// No allocation ever exceeds its batch's availability
        #[test]
        fn prop_allocations_clamped(
            candidates in candidates_strategy(),
            requested in 1i64..=1_000
        ) {
            if let Ok(allocations) = plan_discard(&candidates, requested) {
                for allocation in &allocations {
                    let source = candidates
                        .iter()
                        .find(|c| c.batch_number == allocation.batch_number)
                        .unwrap();
                    prop_assert!(allocation.quantity >= 1);
                    prop_assert!(allocation.quantity <= source.available);
                }
            }
        }

        /// At most one allocation per batch
        #[test]
        fn prop_one_allocation_per_batch(
            candidates in candidates_strategy(),
            requested in 1i64..=1_000
        ) {
            if let Ok(allocations) = plan_discard(&candidates, requested) {
                let mut numbers: Vec<&str> =
                    allocations.iter().map(|a| a.batch_number.as_str()).collect();
                numbers.sort_unstable();
                let before = numbers.len();
                numbers.dedup();
                prop_assert_eq!(before, numbers.len());
            }
        }

        /// Allocations come out in expiry order
        #[test]
        fn prop_allocations_expiry_ordered(
            candidates in candidates_strategy(),
            requested in 1i64..=1_000
        ) {
            if let Ok(allocations) = plan_discard(&candidates, requested) {
                for pair in allocations.windows(2) {
                    prop_assert!(pair[0].expiry_date <= pair[1].expiry_date);
                }
            }
        }
    }
}
