//! Validation utilities for the Pharmacy Stock Management Platform

use rust_decimal::Decimal;

use crate::models::LineItem;

/// Validate a batch number: non-empty, at most 40 characters, no whitespace
/// or control characters. Batch numbers may be human-assigned, so the format
/// is otherwise free.
pub fn validate_batch_number(number: &str) -> Result<(), &'static str> {
    if number.is_empty() {
        return Err("Batch number cannot be empty");
    }
    if number.chars().count() > 40 {
        return Err("Batch number must be at most 40 characters");
    }
    if number.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("Batch number cannot contain whitespace");
    }
    Ok(())
}

/// Validate a line item for any write (draft or finalized).
pub fn validate_line_item(item: &LineItem) -> Result<(), String> {
    if item.medicine_name.trim().is_empty() {
        return Err(format!(
            "Line item for medicine {} has an empty name",
            item.medicine_id
        ));
    }
    if item.quantity < 0 {
        return Err(format!(
            "{}: quantity cannot be negative (got {})",
            item.medicine_name, item.quantity
        ));
    }
    if item.price < Decimal::ZERO {
        return Err(format!(
            "{}: price cannot be negative (got {})",
            item.medicine_name, item.price
        ));
    }
    if item.reorder_level < 0 {
        return Err(format!(
            "{}: reorder level cannot be negative",
            item.medicine_name
        ));
    }
    Ok(())
}

/// Validate line items for the draft -> finalized transition: once a batch is
/// live, every item needs an expiry date and a positive price.
pub fn validate_for_finalize(items: &[LineItem]) -> Result<(), String> {
    for item in items {
        validate_line_item(item)?;
        if item.expiry_date.is_none() {
            return Err(format!("{}: expiry date is required", item.medicine_name));
        }
        if item.price <= Decimal::ZERO {
            return Err(format!(
                "{}: price must be positive to finalize",
                item.medicine_name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(quantity: i64, price: Decimal, expiry: Option<NaiveDate>) -> LineItem {
        LineItem {
            medicine_id: 1,
            medicine_name: "Paracetamol 500mg".to_string(),
            quantity,
            price,
            expiry_date: expiry,
            date_of_purchase: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            reorder_level: 50,
            total_amount: Decimal::from(quantity) * price,
        }
    }

    #[test]
    fn test_validate_batch_number_valid() {
        assert!(validate_batch_number("B-001").is_ok());
        assert!(validate_batch_number("PH-2025-0042").is_ok());
    }

    #[test]
    fn test_validate_batch_number_invalid() {
        assert!(validate_batch_number("").is_err());
        assert!(validate_batch_number("B 001").is_err());
        assert!(validate_batch_number(&"X".repeat(41)).is_err());
    }

    #[test]
    fn test_validate_line_item_valid() {
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(validate_line_item(&item(100, Decimal::from(2), expiry)).is_ok());
        // Zero quantity is allowed: fully discarded items stay in place.
        assert!(validate_line_item(&item(0, Decimal::from(2), expiry)).is_ok());
    }

    #[test]
    fn test_validate_line_item_negative_quantity() {
        assert!(validate_line_item(&item(-1, Decimal::from(2), None)).is_err());
    }

    #[test]
    fn test_validate_line_item_negative_price() {
        assert!(validate_line_item(&item(1, Decimal::from(-2), None)).is_err());
    }

    #[test]
    fn test_validate_for_finalize_requires_expiry() {
        let no_expiry = item(10, Decimal::from(2), None);
        assert!(validate_for_finalize(std::slice::from_ref(&no_expiry)).is_err());
    }

    #[test]
    fn test_validate_for_finalize_requires_positive_price() {
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 1);
        let free = item(10, Decimal::ZERO, expiry);
        assert!(validate_for_finalize(std::slice::from_ref(&free)).is_err());
    }

    #[test]
    fn test_validate_for_finalize_ok() {
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 1);
        let items = vec![item(10, Decimal::from(2), expiry)];
        assert!(validate_for_finalize(&items).is_ok());
    }

    #[test]
    fn test_validate_for_finalize_empty_batch() {
        assert!(validate_for_finalize(&[]).is_ok());
    }
}
