use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::QueueError;

/// A row of the shared `statuses` lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    /// Staff-facing label.
    pub name_internal: String,
    /// Client-facing label.
    pub name_external: String,
    pub severity_color: Option<String>,
    pub status_category: Option<i64>,
}

/// A row of the shared `extension_date_options` lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOption {
    pub id: i64,
    pub name: String,
}

/// The part a status plays in queue bookkeeping.
///
/// Statuses are rows in a table, so ids differ between deployments; the
/// role is what the reconciler and validators branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRole {
    Received,
    AwaitingInfo,
    Extended,
    Mailed,
    Completed,
    Other,
}

impl StatusRole {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::AwaitingInfo => "awaiting_info",
            Self::Extended => "extended",
            Self::Mailed => "mailed",
            Self::Completed => "completed",
            Self::Other => "other",
        }
    }

    /// Classify a status by its internal name.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace and
    /// the separator between words (`Awaiting Info`, `awaiting-info`).
    #[must_use]
    pub fn from_internal_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "received" => Self::Received,
            "awaiting info" | "awaiting information" => Self::AwaitingInfo,
            "extended" => Self::Extended,
            "mailed" => Self::Mailed,
            "completed" | "complete" => Self::Completed,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StatusRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status ids resolved to their roles, once, at catalog load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRoles {
    by_id: HashMap<i64, StatusRole>,
    received: i64,
}

impl StatusRoles {
    /// Resolve roles for a status catalog.
    ///
    /// When two statuses share the Received role the lowest id becomes the
    /// default for new items; both still map to the role.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::MissingStatusRole`] if the catalog has no
    /// Received, Extended, or Completed status.
    pub fn resolve(statuses: &[Status]) -> Result<Self, QueueError> {
        let mut sorted: Vec<&Status> = statuses.iter().collect();
        sorted.sort_by_key(|s| s.id);

        let mut by_id = HashMap::with_capacity(sorted.len());
        let mut received = None;
        for status in sorted {
            let role = StatusRole::from_internal_name(&status.name_internal);
            by_id.insert(status.id, role);
            if role == StatusRole::Received && received.is_none() {
                received = Some(status.id);
            }
        }

        for required in [StatusRole::Extended, StatusRole::Completed] {
            if !by_id.values().any(|role| *role == required) {
                return Err(QueueError::MissingStatusRole(required));
            }
        }
        Ok(Self {
            by_id,
            received: received.ok_or(QueueError::MissingStatusRole(StatusRole::Received))?,
        })
    }

    /// Role of a status id, if the id is known.
    #[must_use]
    pub fn role_of(&self, status_id: i64) -> Option<StatusRole> {
        self.by_id.get(&status_id).copied()
    }

    /// Role of an item's status; an unknown id is an integrity error.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownStatus`] when `status_id` is not in the catalog.
    pub fn require_role(&self, item_id: i64, status_id: i64) -> Result<StatusRole, QueueError> {
        self.role_of(status_id)
            .ok_or(QueueError::UnknownStatus { item_id, status_id })
    }

    #[must_use]
    pub const fn received_id(&self) -> i64 {
        self.received
    }
}

#[cfg(test)]
pub(crate) fn seeded_statuses() -> Vec<Status> {
    [
        (1, "Received", "Received and waiting in line"),
        (2, "In Progress", "Being prepared"),
        (3, "Awaiting Info", "Waiting on information from you"),
        (4, "Extended", "Extended"),
        (5, "Mailed", "Mailed to you for signature"),
        (10, "Completed", "Completed"),
    ]
    .into_iter()
    .map(|(id, internal, external)| Status {
        id,
        name_internal: internal.to_string(),
        name_external: external.to_string(),
        severity_color: None,
        status_category: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_matching_ignores_case_and_separators() {
        assert_eq!(StatusRole::from_internal_name(" Received "), StatusRole::Received);
        assert_eq!(StatusRole::from_internal_name("COMPLETED"), StatusRole::Completed);
        assert_eq!(StatusRole::from_internal_name("awaiting-info"), StatusRole::AwaitingInfo);
        assert_eq!(StatusRole::from_internal_name("Awaiting  Information"), StatusRole::AwaitingInfo);
        assert_eq!(StatusRole::from_internal_name("In Progress"), StatusRole::Other);
    }

    #[test]
    fn resolve_maps_seeded_catalog() {
        let roles = StatusRoles::resolve(&seeded_statuses()).expect("resolve");
        assert_eq!(roles.received_id(), 1);
        assert_eq!(roles.role_of(4), Some(StatusRole::Extended));
        assert_eq!(roles.role_of(10), Some(StatusRole::Completed));
        assert_eq!(roles.role_of(5), Some(StatusRole::Mailed));
        assert_eq!(roles.role_of(2), Some(StatusRole::Other));
        assert_eq!(roles.role_of(99), None);
    }

    #[test]
    fn resolve_rejects_catalog_without_completed() {
        let statuses: Vec<Status> = seeded_statuses()
            .into_iter()
            .filter(|s| s.id != 10)
            .collect();
        let err = StatusRoles::resolve(&statuses).expect_err("must fail");
        assert!(matches!(err, QueueError::MissingStatusRole(StatusRole::Completed)));
    }

    #[test]
    fn lowest_id_wins_duplicate_role() {
        let mut statuses = seeded_statuses();
        statuses.push(Status {
            id: 0,
            name_internal: "received".into(),
            name_external: "Received".into(),
            severity_color: None,
            status_category: None,
        });
        let roles = StatusRoles::resolve(&statuses).expect("resolve");
        assert_eq!(roles.received_id(), 0);
        assert_eq!(roles.role_of(1), Some(StatusRole::Received));
    }

    #[test]
    fn unknown_status_is_integrity_error() {
        let roles = StatusRoles::resolve(&seeded_statuses()).expect("resolve");
        let err = roles.require_role(7, 42).expect_err("unknown id");
        assert!(matches!(err, QueueError::UnknownStatus { item_id: 7, status_id: 42 }));
    }
}
