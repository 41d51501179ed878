//! Activity log models
//!
//! The activity log is append-only: entries are written once alongside the
//! batch mutation they describe and are never edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::FieldChange;

/// Maximum length of the free-text `details` field.
pub const MAX_DETAILS_LEN: usize = 500;

/// The mutation a log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchAction {
    Created,
    Finalized,
    Updated,
    Deleted,
}

impl BatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchAction::Created => "CREATED",
            BatchAction::Finalized => "FINALIZED",
            BatchAction::Updated => "UPDATED",
            BatchAction::Deleted => "DELETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(BatchAction::Created),
            "FINALIZED" => Some(BatchAction::Finalized),
            "UPDATED" => Some(BatchAction::Updated),
            "DELETED" => Some(BatchAction::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only record of a batch mutation.
///
/// Entries reference the batch by id and number but have no foreign-key
/// cascade: they remain queryable after the batch is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub batch_number: String,
    pub action: BatchAction,
    pub details: String,
    /// Actor id supplied by the identity layer.
    pub owner: Uuid,
    /// Field-level diff; populated for `Updated` actions.
    pub changes: Vec<FieldChange>,
    pub timestamp: DateTime<Utc>,
}

/// Clamp free-text details to [`MAX_DETAILS_LEN`] characters.
pub fn truncate_details(details: &str) -> String {
    if details.chars().count() <= MAX_DETAILS_LEN {
        details.to_string()
    } else {
        details.chars().take(MAX_DETAILS_LEN).collect()
    }
}
