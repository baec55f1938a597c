//! Read-side queries over the `workqueue` table.
//!
//! Every listing comes back in rank order: ranked items by `position`,
//! then unranked (completed) items, with `item_id` as the tiebreak.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::fmt::Write as _;

use super::from_us;
use crate::error::QueueError;
use crate::model::item::WorkItem;

pub(crate) const ITEM_COLUMNS: &str = "item_id, account_id, identifier, return_year, status_id, \
     position, external_queue_position, extension_date_id, received_at_us, \
     last_updated_at_us, last_updated_by, notes, completed_at_us";

pub(crate) const RANK_ORDER: &str = "ORDER BY position IS NULL, position ASC, item_id ASC";

/// Filter for [`list_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub return_year: Option<i32>,
    pub status_id: Option<i64>,
    /// Completed items (those holding no position) are hidden unless set.
    pub include_completed: bool,
    /// Case-insensitive substring over identifier and notes.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

pub(crate) fn row_to_work_item(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        id: row.get(0)?,
        account_id: row.get(1)?,
        identifier: row.get(2)?,
        return_year: row.get(3)?,
        status_id: row.get(4)?,
        position: row.get(5)?,
        external_queue_position: row.get(6)?,
        extension_date_id: row.get(7)?,
        received_at: from_us(row.get(8)?),
        last_updated_at: from_us(row.get(9)?),
        last_updated_by: row.get(10)?,
        notes: row.get(11)?,
        completed_at: row.get::<_, Option<i64>>(12)?.map(from_us),
    })
}

/// Fetch one item of an account.
///
/// # Errors
///
/// Returns [`QueueError::ItemNotFound`] if the item does not exist in this
/// account.
pub fn get_item(conn: &Connection, account_id: i64, item_id: i64) -> Result<WorkItem, QueueError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM workqueue WHERE account_id = ?1 AND item_id = ?2");
    conn.query_row(&sql, params![account_id, item_id], row_to_work_item)
        .optional()?
        .ok_or(QueueError::ItemNotFound(item_id))
}

/// Look an item up by its public key.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn find_item_by_identifier(
    conn: &Connection,
    account_id: i64,
    return_year: i32,
    identifier: &str,
) -> Result<Option<WorkItem>, QueueError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM workqueue \
         WHERE account_id = ?1 AND return_year = ?2 AND identifier = ?3"
    );
    Ok(conn
        .query_row(&sql, params![account_id, return_year, identifier.trim()], row_to_work_item)
        .optional()?)
}

/// Every item of an account, in rank order.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn account_items_in_rank_order(
    conn: &Connection,
    account_id: i64,
) -> Result<Vec<WorkItem>, QueueError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM workqueue WHERE account_id = ?1 {RANK_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![account_id], row_to_work_item)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Filtered listing of an account's items, in rank order.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn list_items(
    conn: &Connection,
    account_id: i64,
    filter: &ItemFilter,
) -> Result<Vec<WorkItem>, QueueError> {
    let mut conditions = vec!["account_id = ?1".to_string()];
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(account_id)];

    if !filter.include_completed {
        conditions.push("position IS NOT NULL".to_string());
    }

    if let Some(year) = filter.return_year {
        param_values.push(Box::new(year));
        conditions.push(format!("return_year = ?{}", param_values.len()));
    }

    if let Some(status_id) = filter.status_id {
        param_values.push(Box::new(status_id));
        conditions.push(format!("status_id = ?{}", param_values.len()));
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        param_values.push(Box::new(format!("%{}%", escape_like(term))));
        let n = param_values.len();
        conditions.push(format!(
            "(identifier LIKE ?{n} ESCAPE '\\' OR IFNULL(notes, '') LIKE ?{n} ESCAPE '\\')"
        ));
    }

    let mut sql = format!(
        "SELECT {ITEM_COLUMNS} FROM workqueue WHERE {} {RANK_ORDER}",
        conditions.join(" AND ")
    );
    if let Some(limit) = filter.limit {
        let _ = write!(sql, " LIMIT {limit}");
    }

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();
    let rows = stmt.query_map(params_from_iter(params_ref), row_to_work_item)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Highest staff-facing position in the account, 0 when the queue is empty.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn max_position(conn: &Connection, account_id: i64) -> Result<u32, QueueError> {
    Ok(conn.query_row(
        "SELECT IFNULL(MAX(position), 0) FROM workqueue WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )?)
}

/// Highest client-facing position in the account, 0 when nobody is waiting.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn max_external_position(conn: &Connection, account_id: i64) -> Result<u32, QueueError> {
    Ok(conn.query_row(
        "SELECT IFNULL(MAX(external_queue_position), 0) FROM workqueue WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )?)
}

/// True when no other item of the account uses `identifier` for
/// `return_year`. The match is exact and case-sensitive on the trimmed
/// identifier; `exclude_item_id` skips the item being edited.
///
/// The UNIQUE constraint remains the authority; this is the friendly
/// pre-check.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn is_identifier_available(
    conn: &Connection,
    account_id: i64,
    return_year: i32,
    identifier: &str,
    exclude_item_id: Option<i64>,
) -> Result<bool, QueueError> {
    Ok(conn.query_row(
        "SELECT NOT EXISTS(
            SELECT 1 FROM workqueue
            WHERE account_id = ?1 AND return_year = ?2 AND identifier = ?3
              AND (?4 IS NULL OR item_id <> ?4)
        )",
        params![account_id, return_year, identifier.trim(), exclude_item_id],
        |row| row.get(0),
    )?)
}
