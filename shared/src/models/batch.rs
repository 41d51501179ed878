//! Batch and line-item models
//!
//! A batch is one purchase/intake event grouping several medicine line items
//! under one bill. Line items are value objects owned by their batch: they
//! carry a snapshot of the catalog entry (name, reorder level) taken at entry
//! time and are never re-read from the catalog afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AttachmentRef;

/// One medicine's quantity/price/expiry record within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub medicine_id: i64,
    /// Catalog name at time of entry; does not track later renames.
    pub medicine_name: String,
    /// Remaining units in this batch.
    pub quantity: i64,
    /// Unit sale price.
    pub price: Decimal,
    /// Required before the batch can be finalized.
    pub expiry_date: Option<NaiveDate>,
    pub date_of_purchase: NaiveDate,
    /// Reorder threshold at time of entry.
    pub reorder_level: i64,
    /// quantity x price at time of last write.
    pub total_amount: Decimal,
}

impl LineItem {
    /// Re-derive `total_amount` from the current quantity and price.
    pub fn with_derived_total(mut self) -> Self {
        self.total_amount = line_total(self.quantity, self.price);
        self
    }
}

/// A purchase batch, draft or finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    /// Globally unique across drafts and finalized batches, immutable once set.
    pub batch_number: String,
    /// External bill reference, not unique.
    pub bill_id: Option<String>,
    pub line_items: Vec<LineItem>,
    /// Sum of line-item totals; miscellaneous tracked separately.
    pub overall_price: Decimal,
    pub miscellaneous_amount: Decimal,
    pub attachments: Vec<AttachmentRef>,
    pub is_draft: bool,
    pub draft_note: Option<String>,
    /// Set exactly once, on the draft -> finalized transition.
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Concurrency token; bumped on every write.
    pub version: i64,
}

/// One field-level change recorded on an `Updated` activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Line total at the current quantity and price.
pub fn line_total(quantity: i64, price: Decimal) -> Decimal {
    Decimal::from(quantity) * price
}

/// Batch total: the sum of all line-item totals.
pub fn overall_price(items: &[LineItem]) -> Decimal {
    items.iter().map(|i| i.total_amount).sum()
}

/// Compute the field-level diff between two revisions of a batch's editable
/// state. Line items are matched by medicine id; the batch number and
/// timestamps are immutable and never appear in the diff.
pub fn diff_batches(old: &Batch, new: &Batch) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for old_item in &old.line_items {
        match new
            .line_items
            .iter()
            .find(|i| i.medicine_id == old_item.medicine_id)
        {
            Some(new_item) => diff_line_item(old_item, new_item, &mut changes),
            None => changes.push(FieldChange {
                field: format!("line_items[{}]", old_item.medicine_id),
                old_value: describe_item(old_item),
                new_value: "removed".to_string(),
            }),
        }
    }

    for new_item in &new.line_items {
        if !old
            .line_items
            .iter()
            .any(|i| i.medicine_id == new_item.medicine_id)
        {
            changes.push(FieldChange {
                field: format!("line_items[{}]", new_item.medicine_id),
                old_value: "none".to_string(),
                new_value: describe_item(new_item),
            });
        }
    }

    if old.miscellaneous_amount != new.miscellaneous_amount {
        changes.push(FieldChange {
            field: "miscellaneous_amount".to_string(),
            old_value: old.miscellaneous_amount.to_string(),
            new_value: new.miscellaneous_amount.to_string(),
        });
    }

    if old.overall_price != new.overall_price {
        changes.push(FieldChange {
            field: "overall_price".to_string(),
            old_value: old.overall_price.to_string(),
            new_value: new.overall_price.to_string(),
        });
    }

    if old.draft_note != new.draft_note {
        changes.push(FieldChange {
            field: "draft_note".to_string(),
            old_value: old.draft_note.clone().unwrap_or_default(),
            new_value: new.draft_note.clone().unwrap_or_default(),
        });
    }

    if old.attachments != new.attachments {
        changes.push(FieldChange {
            field: "attachments".to_string(),
            old_value: format!("{} attachment(s)", old.attachments.len()),
            new_value: format!("{} attachment(s)", new.attachments.len()),
        });
    }

    changes
}

fn diff_line_item(old: &LineItem, new: &LineItem, changes: &mut Vec<FieldChange>) {
    let prefix = format!("line_items[{}]", old.medicine_id);

    if old.quantity != new.quantity {
        changes.push(FieldChange {
            field: format!("{prefix}.quantity"),
            old_value: old.quantity.to_string(),
            new_value: new.quantity.to_string(),
        });
    }
    if old.price != new.price {
        changes.push(FieldChange {
            field: format!("{prefix}.price"),
            old_value: old.price.to_string(),
            new_value: new.price.to_string(),
        });
    }
    if old.expiry_date != new.expiry_date {
        changes.push(FieldChange {
            field: format!("{prefix}.expiry_date"),
            old_value: describe_date(old.expiry_date),
            new_value: describe_date(new.expiry_date),
        });
    }
    if old.total_amount != new.total_amount {
        changes.push(FieldChange {
            field: format!("{prefix}.total_amount"),
            old_value: old.total_amount.to_string(),
            new_value: new.total_amount.to_string(),
        });
    }
}

fn describe_item(item: &LineItem) -> String {
    format!(
        "{} x{} @ {} (expires {})",
        item.medicine_name,
        item.quantity,
        item.price,
        describe_date(item.expiry_date)
    )
}

fn describe_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.to_string(),
        None => "none".to_string(),
    }
}
