//! SQLite workqueue store.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers are not blocked by the single writer
//! - `busy_timeout` from [`StoreConfig`] before a write reports busy
//! - `foreign_keys = ON` so items cannot point at missing accounts or catalogs

pub mod accounts;
pub mod lookups;
pub mod migrations;
pub mod query;
pub mod schema;
pub mod stats;
pub mod workqueue;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::StoreConfig;

/// Open (or create) the store, apply runtime pragmas, and migrate the
/// schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path, config: &StoreConfig) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;

    configure_connection(&conn, config).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open an existing store, returning `None` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be opened or migrated.
pub fn try_open_store(path: &Path, config: &StoreConfig) -> Result<Option<Connection>> {
    if !path.exists() {
        return Ok(None);
    }
    open_store(path, config).map(Some)
}

/// In-memory store with the full schema, for tests and dry runs.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}

/// Current time as microseconds since the Unix epoch.
pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

pub(crate) fn from_us(us: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_micros(us).unwrap_or_default()
}
