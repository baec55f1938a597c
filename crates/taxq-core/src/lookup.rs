//! Read-through cache of the status and extension-option catalogs.
//!
//! The cache is a plain value the caller owns and passes into every store
//! operation that needs the catalogs. Writes to the lookup tables made
//! through [`crate::db::lookups`] invalidate it.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::Connection;

use crate::db::lookups;
use crate::error::QueueError;
use crate::model::status::{ExtensionOption, Status, StatusRoles};

/// Statuses and extension options as seen by one account, with roles resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    statuses: Vec<Status>,
    extension_options: Vec<ExtensionOption>,
    roles: StatusRoles,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns [`QueueError::MissingStatusRole`] if a required role is absent.
    pub fn new(
        statuses: Vec<Status>,
        extension_options: Vec<ExtensionOption>,
    ) -> Result<Self, QueueError> {
        let roles = StatusRoles::resolve(&statuses)?;
        Ok(Self {
            statuses,
            extension_options,
            roles,
        })
    }

    #[must_use]
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    #[must_use]
    pub fn extension_options(&self) -> &[ExtensionOption] {
        &self.extension_options
    }

    #[must_use]
    pub const fn roles(&self) -> &StatusRoles {
        &self.roles
    }

    #[must_use]
    pub fn status(&self, id: i64) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn extension(&self, id: i64) -> Option<&ExtensionOption> {
        self.extension_options.iter().find(|o| o.id == id)
    }

    /// Resolve a user-supplied status reference: a numeric id or an
    /// internal name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns a validation error when nothing matches.
    pub fn resolve_status(&self, reference: &str) -> Result<&Status, QueueError> {
        let reference = reference.trim();
        let found = match reference.parse::<i64>() {
            Ok(id) => self.status(id),
            Err(_) => self
                .statuses
                .iter()
                .find(|s| s.name_internal.eq_ignore_ascii_case(reference)),
        };
        found.ok_or_else(|| {
            QueueError::invalid("status", format!("no status matches '{reference}'"))
        })
    }

    /// Resolve an extension option by numeric id or name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns a validation error when nothing matches.
    pub fn resolve_extension(&self, reference: &str) -> Result<&ExtensionOption, QueueError> {
        let reference = reference.trim();
        let found = match reference.parse::<i64>() {
            Ok(id) => self.extension(id),
            Err(_) => self
                .extension_options
                .iter()
                .find(|o| o.name.eq_ignore_ascii_case(reference)),
        };
        found.ok_or_else(|| {
            QueueError::invalid("extension", format!("no extension date matches '{reference}'"))
        })
    }

    /// Check that an extension id exists in the catalog.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown ids.
    pub fn require_extension(&self, id: i64) -> Result<&ExtensionOption, QueueError> {
        self.extension(id)
            .ok_or_else(|| QueueError::invalid("extension", format!("unknown extension date id {id}")))
    }

    /// Check that a status id exists in the catalog.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown ids.
    pub fn require_status(&self, id: i64) -> Result<&Status, QueueError> {
        self.status(id)
            .ok_or_else(|| QueueError::invalid("status", format!("unknown status id {id}")))
    }
}

/// Per-account read-through cache of [`Catalog`]s.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: HashMap<i64, Arc<Catalog>>,
    loads: u64,
}

impl LookupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog for `account_id`, loading it on a miss.
    ///
    /// # Errors
    ///
    /// Returns a store error if loading fails, or an integrity error if the
    /// loaded catalog lacks a required status role.
    pub fn catalog(&mut self, conn: &Connection, account_id: i64) -> Result<Arc<Catalog>, QueueError> {
        if let Some(catalog) = self.entries.get(&account_id) {
            return Ok(Arc::clone(catalog));
        }

        let catalog = Arc::new(Catalog::new(
            lookups::load_statuses(conn)?,
            lookups::load_extension_options(conn)?,
        )?);
        self.loads += 1;
        tracing::debug!(account_id, statuses = catalog.statuses().len(), "loaded lookup catalog");
        self.entries.insert(account_id, Arc::clone(&catalog));
        Ok(catalog)
    }

    pub fn invalidate(&mut self, account_id: i64) {
        self.entries.remove(&account_id);
    }

    /// Drop every cached catalog; used after writes to the shared tables.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Number of catalog loads performed (cache misses).
    #[must_use]
    pub const fn loads(&self) -> u64 {
        self.loads
    }
}
