//! Batch lifecycle tests
//!
//! Tests for batch invariants including:
//! - Overall price always equals the sum of line-item totals
//! - Field-level diffs capture every editable change
//! - Finalize validation (expiry required, positive price)

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    diff_batches, line_total, overall_price, validate_batch_number, validate_for_finalize,
    AttachmentRef, Batch, LineItem,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(medicine_id: i64, quantity: i64, price: Decimal, expiry: Option<NaiveDate>) -> LineItem {
    LineItem {
        medicine_id,
        medicine_name: format!("Medicine {}", medicine_id),
        quantity,
        price,
        expiry_date: expiry,
        date_of_purchase: day(2025, 1, 10),
        reorder_level: 50,
        total_amount: line_total(quantity, price),
    }
    .with_derived_total()
}

fn batch(line_items: Vec<LineItem>) -> Batch {
    let now = Utc::now();
    Batch {
        id: Uuid::new_v4(),
        batch_number: "B-001".to_string(),
        bill_id: Some("BILL-17".to_string()),
        overall_price: overall_price(&line_items),
        line_items,
        miscellaneous_amount: Decimal::ZERO,
        attachments: Vec::new(),
        is_draft: true,
        draft_note: None,
        finalized_at: None,
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        version: 1,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(100, dec("2")), dec("200"));
        assert_eq!(line_total(0, dec("9.99")), Decimal::ZERO);
    }

    #[test]
    fn test_overall_price_sums_line_totals() {
        let items = vec![
            item(1, 100, dec("2.00"), Some(day(2026, 1, 1))),
            item(2, 30, dec("5.50"), Some(day(2026, 6, 1))),
        ];
        // 200 + 165 = 365
        assert_eq!(overall_price(&items), dec("365.00"));
    }

    #[test]
    fn test_overall_price_empty_batch() {
        assert_eq!(overall_price(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_derived_total_tracks_quantity() {
        let mut li = item(7, 100, dec("2"), Some(day(2026, 1, 1)));
        li.quantity = 70;
        let li = li.with_derived_total();
        assert_eq!(li.total_amount, dec("140"));
    }

    #[test]
    fn test_diff_identical_batches_is_empty() {
        let b = batch(vec![item(1, 10, dec("1.50"), Some(day(2026, 3, 1)))]);
        assert!(diff_batches(&b, &b.clone()).is_empty());
    }

    #[test]
    fn test_diff_detects_quantity_change() {
        let old = batch(vec![item(7, 100, dec("2"), Some(day(2026, 3, 1)))]);
        let mut new = old.clone();
        new.line_items[0].quantity = 70;
        new.line_items[0] = new.line_items[0].clone().with_derived_total();
        new.overall_price = overall_price(&new.line_items);

        let changes = diff_batches(&old, &new);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert!(fields.contains(&"line_items[7].quantity"));
        assert!(fields.contains(&"line_items[7].total_amount"));
        assert!(fields.contains(&"overall_price"));

        let qty = changes
            .iter()
            .find(|c| c.field == "line_items[7].quantity")
            .unwrap();
        assert_eq!(qty.old_value, "100");
        assert_eq!(qty.new_value, "70");
    }

    #[test]
    fn test_diff_detects_removed_and_added_items() {
        let old = batch(vec![item(1, 10, dec("1"), Some(day(2026, 3, 1)))]);
        let new = batch(vec![item(2, 5, dec("4"), Some(day(2026, 4, 1)))]);

        let changes = diff_batches(&old, &new);
        assert!(changes.iter().any(|c| c.field == "line_items[1]" && c.new_value == "removed"));
        assert!(changes.iter().any(|c| c.field == "line_items[2]" && c.old_value == "none"));
    }

    #[test]
    fn test_diff_detects_misc_and_note_changes() {
        let old = batch(vec![]);
        let mut new = old.clone();
        new.miscellaneous_amount = dec("12.50");
        new.draft_note = Some("awaiting invoice".to_string());
        new.attachments = vec![AttachmentRef {
            url: "https://files.example/bill-17.pdf".to_string(),
            original_filename: None,
        }];

        let changes = diff_batches(&old, &new);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert!(fields.contains(&"miscellaneous_amount"));
        assert!(fields.contains(&"draft_note"));
        assert!(fields.contains(&"attachments"));
    }

    #[test]
    fn test_finalize_rejects_missing_expiry() {
        let items = vec![item(1, 10, dec("2"), None)];
        assert!(validate_for_finalize(&items).is_err());
    }

    #[test]
    fn test_finalize_rejects_zero_price() {
        let items = vec![item(1, 10, Decimal::ZERO, Some(day(2026, 1, 1)))];
        assert!(validate_for_finalize(&items).is_err());
    }

    #[test]
    fn test_finalize_accepts_valid_items() {
        let items = vec![
            item(1, 10, dec("2"), Some(day(2026, 1, 1))),
            item(2, 0, dec("1.25"), Some(day(2026, 2, 1))),
        ];
        assert!(validate_for_finalize(&items).is_ok());
    }

    #[test]
    fn test_batch_number_rules() {
        assert!(validate_batch_number("B-001").is_ok());
        assert!(validate_batch_number("").is_err());
        assert!(validate_batch_number("has space").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating quantities
    fn quantity_strategy() -> impl Strategy<Value = i64> {
        0i64..=10_000
    }

    /// Strategy for generating unit prices (0.01 to 1000.00)
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000).prop_map(|n| Decimal::new(n, 2))
    }

    fn items_strategy() -> impl Strategy<Value = Vec<LineItem>> {
        prop::collection::vec((quantity_strategy(), price_strategy()), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (q, p))| item(i as i64 + 1, q, p, Some(day(2026, 1, 1))))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// overall_price always equals the sum of line-item totals
        #[test]
        fn prop_overall_price_is_sum(items in items_strategy()) {
            let expected: Decimal = items.iter().map(|i| i.total_amount).sum();
            prop_assert_eq!(overall_price(&items), expected);
        }

        /// Every line item's total is quantity x price after derivation
        #[test]
        fn prop_derived_total_consistent(
            quantity in quantity_strategy(),
            price in price_strategy()
        ) {
            let li = item(1, quantity, price, Some(day(2026, 1, 1)));
            prop_assert_eq!(li.total_amount, Decimal::from(quantity) * price);
        }

        /// A diff of a batch against itself is always empty
        #[test]
        fn prop_self_diff_empty(items in items_strategy()) {
            let b = batch(items);
            prop_assert!(diff_batches(&b, &b.clone()).is_empty());
        }

        /// Changing one quantity always produces a quantity change entry
        #[test]
        fn prop_quantity_change_always_diffed(
            initial in 1i64..=10_000,
            delta in 1i64..=100,
            price in price_strategy()
        ) {
            let old = batch(vec![item(1, initial, price, Some(day(2026, 1, 1)))]);
            let mut new = old.clone();
            new.line_items[0].quantity = initial - delta.min(initial);
            new.line_items[0] = new.line_items[0].clone().with_derived_total();

            let changes = diff_batches(&old, &new);
            if new.line_items[0].quantity != initial {
                prop_assert!(changes.iter().any(|c| c.field == "line_items[1].quantity"));
            }
        }
    }
}
