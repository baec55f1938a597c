use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tracked tax filing (a row of the `workqueue` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    pub account_id: i64,
    /// Short filing code, unique per account and return year.
    pub identifier: String,
    pub return_year: i32,
    pub status_id: i64,
    /// Staff-facing rank; `None` for completed filings.
    pub position: Option<u32>,
    /// Client-facing rank; set only while the filing is Received.
    pub external_queue_position: Option<u32>,
    pub extension_date_id: Option<i64>,
    pub received_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub last_updated_by: Option<String>,
    /// Internal notes; never shown to clients.
    pub notes: Option<String>,
    /// When the filing entered the Completed status; `None` while active.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// Both ranks, as a pair, for comparisons.
    #[must_use]
    pub const fn ranks(&self) -> (Option<u32>, Option<u32>) {
        (self.position, self.external_queue_position)
    }
}

/// Input for creating a work item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewWorkItem {
    pub identifier: String,
    pub return_year: i32,
    /// Defaults to the Received status.
    pub status_id: Option<i64>,
    pub extension_date_id: Option<i64>,
    /// Defaults to the creation time.
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// 1-based rank to insert at; `None` appends to the tail of the queue.
    pub insert_at: Option<u32>,
}

impl NewWorkItem {
    #[must_use]
    pub fn new(identifier: impl Into<String>, return_year: i32) -> Self {
        Self {
            identifier: identifier.into(),
            return_year,
            ..Self::default()
        }
    }
}

/// A field-level edit. `None` leaves the field unchanged.
///
/// Nullable fields use `Option<Option<_>>`: `Some(None)` clears the value.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemPatch {
    pub identifier: Option<String>,
    pub return_year: Option<i32>,
    pub status_id: Option<i64>,
    pub extension_date_id: Option<Option<i64>>,
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<Option<String>>,
}

impl WorkItemPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.identifier.is_none()
            && self.return_year.is_none()
            && self.status_id.is_none()
            && self.extension_date_id.is_none()
            && self.received_at.is_none()
            && self.notes.is_none()
    }

    /// True when applying this patch would move the item to another status.
    #[must_use]
    pub fn changes_status(&self, current: &WorkItem) -> bool {
        self.status_id.is_some_and(|id| id != current.status_id)
    }

    /// True when the identifier or return year would change, which calls
    /// for a fresh availability check.
    #[must_use]
    pub fn changes_identity(&self, current: &WorkItem) -> bool {
        self.identifier
            .as_deref()
            .is_some_and(|ident| ident.trim() != current.identifier)
            || self
                .return_year
                .is_some_and(|year| year != current.return_year)
    }
}

#[cfg(test)]
pub(crate) fn sample_item(id: i64, status_id: i64) -> WorkItem {
    let now = Utc::now();
    WorkItem {
        id,
        account_id: 1,
        identifier: format!("I{id}"),
        return_year: 2024,
        status_id,
        position: None,
        external_queue_position: None,
        extension_date_id: None,
        received_at: now,
        last_updated_at: now,
        last_updated_by: None,
        notes: None,
        completed_at: None,
    }
}
