//! Discard records and the FIFO-by-expiry allocation planner

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::batch::line_total;

/// Reason recorded when the caller does not supply one.
pub const DEFAULT_DISCARD_REASON: &str = "Expired";

/// Historical record of stock removed from circulation.
///
/// One record is created per batch touched by a discard action; records are
/// immutable and outlive the batch they reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardRecord {
    pub id: Uuid,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub quantity_discarded: i64,
    pub price_per_unit: Decimal,
    /// quantity_discarded x price_per_unit, fixed at discard time.
    pub total_value: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub reason: String,
    pub discarded_by: Uuid,
    pub discarded_at: DateTime<Utc>,
}

/// One batch's line item for a medicine, as seen by the planner.
#[derive(Debug, Clone)]
pub struct DiscardCandidate {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub available: i64,
    pub price_per_unit: Decimal,
}

/// Planned consumption from a single batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscardAllocation {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub quantity: i64,
    pub price_per_unit: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

impl DiscardAllocation {
    /// Value of the stock this allocation removes.
    pub fn total_value(&self) -> Decimal {
        line_total(self.quantity, self.price_per_unit)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscardPlanError {
    #[error("discard quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("requested {requested} units but only {available} available")]
    InsufficientStock { requested: i64, available: i64 },
}

/// Plan a discard of `requested` units across the given candidates.
///
/// Candidates are consumed earliest-expiry-first (ties broken by batch
/// number, so the order is deterministic), each clamped to its available
/// quantity. The plan is all-or-nothing: if the candidates cannot cover the
/// requested quantity, no allocation is produced.
pub fn plan_discard(
    candidates: &[DiscardCandidate],
    requested: i64,
) -> Result<Vec<DiscardAllocation>, DiscardPlanError> {
    if requested < 1 {
        return Err(DiscardPlanError::InvalidQuantity(requested));
    }

    let available: i64 = candidates.iter().map(|c| c.available.max(0)).sum();
    if available < requested {
        return Err(DiscardPlanError::InsufficientStock {
            requested,
            available,
        });
    }

    let mut ordered: Vec<&DiscardCandidate> =
        candidates.iter().filter(|c| c.available > 0).collect();
    ordered.sort_by(|a, b| {
        // Items without an expiry date sort last.
        let key_a = (a.expiry_date.is_none(), a.expiry_date, &a.batch_number);
        let key_b = (b.expiry_date.is_none(), b.expiry_date, &b.batch_number);
        key_a.cmp(&key_b)
    });

    let mut remaining = requested;
    let mut allocations = Vec::new();
    for candidate in ordered {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(candidate.available);
        allocations.push(DiscardAllocation {
            batch_id: candidate.batch_id,
            batch_number: candidate.batch_number.clone(),
            quantity: take,
            price_per_unit: candidate.price_per_unit,
            expiry_date: candidate.expiry_date,
        });
        remaining -= take;
    }

    Ok(allocations)
}
