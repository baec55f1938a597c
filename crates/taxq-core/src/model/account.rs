use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant: one firm whose staff share a workqueue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Public handle used by the client status lookup.
    pub subdomain: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}
