//! Mutating operations on the workqueue.
//!
//! Each public function is one unit: a single `BEGIN IMMEDIATE`
//! transaction holding the store-side checks, the primary write, a reload
//! of the account's items in rank order, reconciliation, and the write of
//! every rank that moved. A unit that fails leaves the store untouched.
//! Units that hit a busy or locked store are retried from scratch.

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, TransactionBehavior, params};
use serde::Serialize;

use super::now_us;
use super::query::{
    account_items_in_rank_order, get_item, is_identifier_available, max_external_position,
    max_position,
};
use crate::config::{ProjectConfig, RetryPolicy};
use crate::error::{QueueError, is_unique_violation};
use crate::lookup::{Catalog, LookupCache};
use crate::model::item::{NewWorkItem, WorkItem, WorkItemPatch};
use crate::model::status::{StatusRole, StatusRoles};
use crate::reconcile::{
    RankChange, RankClass, RankViolation, check_ranks, place, rank_changes, reconcile,
    validate_order,
};
use crate::validate::{
    DEFAULT_IDENTIFIER_MAX_LEN, check_extension, normalize_identifier, normalize_notes,
    validate_return_year,
};

/// Settings shared by every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub retry: RetryPolicy,
    pub identifier_max_len: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            identifier_max_len: DEFAULT_IDENTIFIER_MAX_LEN,
        }
    }
}

impl From<&ProjectConfig> for WriteOptions {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            retry: config.store.retry_policy(),
            identifier_max_len: config.identifier.max_len,
        }
    }
}

/// Result of [`recompute_account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecomputeReport {
    pub account_id: i64,
    pub examined: usize,
    pub changes: Vec<RankChange>,
}

/// Create a work item and rank it.
///
/// The item joins the tail of its rank sequences unless `insert_at` names
/// a 1-based slot, in which case it is placed there and everything behind
/// it shifts down by one.
///
/// # Errors
///
/// Validation errors for bad fields or the extension rule,
/// [`QueueError::IdentifierInUse`] when the identifier is taken for the
/// return year, [`QueueError::AccountNotFound`], and store errors.
pub fn create_item(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
    new: &NewWorkItem,
    actor: Option<&str>,
) -> Result<WorkItem, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;
    let roles = catalog.roles();

    let identifier = normalize_identifier(&new.identifier, options.identifier_max_len)?;
    validate_return_year(new.return_year)?;
    let status = match new.status_id {
        Some(id) => catalog.require_status(id)?,
        None => catalog.require_status(roles.received_id())?,
    };
    if let Some(ext) = new.extension_date_id {
        catalog.require_extension(ext)?;
    }
    check_extension(status, roles, new.extension_date_id)?;
    if new.insert_at.is_some() && roles.role_of(status.id) == Some(StatusRole::Completed) {
        return Err(QueueError::invalid(
            "insert_at",
            "completed filings have no queue position",
        ));
    }
    let notes = normalize_notes(new.notes.clone());
    let class = roles
        .role_of(status.id)
        .map_or(RankClass::StaffOnly, RankClass::of);

    let item = run_unit(conn, options.retry, "create", |tx| {
        ensure_account(tx, account_id)?;
        if !is_identifier_available(tx, account_id, new.return_year, &identifier, None)? {
            return Err(in_use(&identifier, new.return_year));
        }

        // Provisional tail ranks; the reconcile below settles them.
        let position = if class.is_ranked() {
            Some(max_position(tx, account_id)? + 1)
        } else {
            None
        };
        let external_queue_position = if class == RankClass::ClientVisible {
            Some(max_external_position(tx, account_id)? + 1)
        } else {
            None
        };

        let now = now_us();
        let received_at = new.received_at.map_or(now, |at| at.timestamp_micros());
        let completed_at = (!class.is_ranked()).then_some(now);
        tx.execute(
            "INSERT INTO workqueue (
                account_id, identifier, return_year, status_id, extension_date_id,
                position, external_queue_position,
                received_at_us, last_updated_at_us, last_updated_by, notes, completed_at_us
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                account_id,
                identifier,
                new.return_year,
                status.id,
                new.extension_date_id,
                position,
                external_queue_position,
                received_at,
                now,
                actor,
                notes,
                completed_at,
            ],
        )
        .map_err(|err| map_write_error(err, &identifier, new.return_year))?;
        let item_id = tx.last_insert_rowid();

        let before = account_items_in_rank_order(tx, account_id)?;
        let ids: Vec<i64> = before.iter().map(|item| item.id).collect();
        let classes = rank_classes(&before, roles)?;
        let order = place(
            &ids,
            |id| classes.get(&id).is_some_and(|class| class.is_ranked()),
            item_id,
            new.insert_at.unwrap_or(u32::MAX),
        );
        apply_order(tx, roles, &before, &order)?;
        get_item(tx, account_id, item_id)
    })?;

    tracing::info!(
        account_id,
        item_id = item.id,
        identifier = %item.identifier,
        return_year = item.return_year,
        position = ?item.position,
        "created work item"
    );
    Ok(item)
}

/// Apply a field-level edit to one item.
///
/// Ranks are recomputed only when the status changes. Moving off the
/// Extended status clears the extension date.
///
/// # Errors
///
/// Validation errors (including an empty patch), the extension rule,
/// [`QueueError::IdentifierInUse`], [`QueueError::ItemNotFound`], and
/// store errors.
pub fn update_item(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
    item_id: i64,
    patch: &WorkItemPatch,
    actor: Option<&str>,
) -> Result<WorkItem, QueueError> {
    if patch.is_empty() {
        return Err(QueueError::invalid("edit", "no fields to change"));
    }
    let catalog = cache.catalog(conn, account_id)?;

    let (item, reranked) = run_unit(conn, options.retry, "update", |tx| {
        let current = get_item(tx, account_id, item_id)?;
        let next = patched(&current, patch, &catalog, options)?;

        if patch.changes_identity(&current)
            && !is_identifier_available(
                tx,
                account_id,
                next.return_year,
                &next.identifier,
                Some(item_id),
            )?
        {
            return Err(in_use(&next.identifier, next.return_year));
        }

        let now = now_us();
        let completed_at = completion_stamp(&current, &next, catalog.roles(), now);
        tx.execute(
            "UPDATE workqueue SET
                identifier = ?1, return_year = ?2, status_id = ?3, extension_date_id = ?4,
                received_at_us = ?5, notes = ?6, last_updated_at_us = ?7, last_updated_by = ?8,
                completed_at_us = ?9
            WHERE item_id = ?10 AND account_id = ?11",
            params![
                next.identifier,
                next.return_year,
                next.status_id,
                next.extension_date_id,
                next.received_at.timestamp_micros(),
                next.notes,
                now,
                actor,
                completed_at,
                item_id,
                account_id,
            ],
        )
        .map_err(|err| map_write_error(err, &next.identifier, next.return_year))?;

        let mut reranked = 0;
        if patch.changes_status(&current) {
            let before = account_items_in_rank_order(tx, account_id)?;
            let order: Vec<i64> = before.iter().map(|item| item.id).collect();
            reranked = apply_order(tx, catalog.roles(), &before, &order)?.len();
        }
        Ok((get_item(tx, account_id, item_id)?, reranked))
    })?;

    tracing::info!(account_id, item_id, reranked, "updated work item");
    Ok(item)
}

/// `completed_at_us` after an edit: stamped on entering Completed, cleared
/// on leaving it, otherwise kept.
fn completion_stamp(
    current: &WorkItem,
    next: &WorkItem,
    roles: &StatusRoles,
    now: i64,
) -> Option<i64> {
    let was = roles.role_of(current.status_id) == Some(StatusRole::Completed);
    let is = roles.role_of(next.status_id) == Some(StatusRole::Completed);
    match (was, is) {
        (false, true) => Some(now),
        (_, false) => None,
        (true, true) => current
            .completed_at
            .map(|at| at.timestamp_micros())
            .or(Some(now)),
    }
}

/// The item as it would look after `patch`, with every field validated.
fn patched(
    current: &WorkItem,
    patch: &WorkItemPatch,
    catalog: &Catalog,
    options: &WriteOptions,
) -> Result<WorkItem, QueueError> {
    let mut next = current.clone();

    if let Some(raw) = &patch.identifier {
        next.identifier = normalize_identifier(raw, options.identifier_max_len)?;
    }
    if let Some(year) = patch.return_year {
        validate_return_year(year)?;
        next.return_year = year;
    }
    if let Some(status_id) = patch.status_id {
        next.status_id = catalog.require_status(status_id)?.id;
    }
    let status = catalog.require_status(next.status_id)?;
    let extended = catalog.roles().role_of(status.id) == Some(StatusRole::Extended);

    next.extension_date_id = match patch.extension_date_id {
        Some(Some(ext)) => Some(catalog.require_extension(ext)?.id),
        Some(None) => None,
        None if extended => current.extension_date_id,
        None => None,
    };
    check_extension(status, catalog.roles(), next.extension_date_id)?;

    if let Some(received_at) = patch.received_at {
        next.received_at = received_at;
    }
    if let Some(notes) = &patch.notes {
        next.notes = normalize_notes(notes.clone());
    }
    Ok(next)
}

/// Re-rank an account to match a full drag order.
///
/// `order` must list every ranked item of the account exactly once.
/// Completed items may appear and are ignored.
///
/// # Errors
///
/// Validation errors for unknown, duplicate, or missing ids, and store
/// errors.
pub fn reorder_items(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
    order: &[i64],
) -> Result<Vec<RankChange>, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;
    let roles = catalog.roles();

    let changes = run_unit(conn, options.retry, "reorder", |tx| {
        ensure_account(tx, account_id)?;
        let before = account_items_in_rank_order(tx, account_id)?;
        let classes = rank_classes(&before, roles)?;
        let known: HashSet<i64> = classes.keys().copied().collect();
        let ranked: HashSet<i64> = classes
            .iter()
            .filter(|(_, class)| class.is_ranked())
            .map(|(id, _)| *id)
            .collect();
        validate_order(order, &known, &ranked)?;

        let full: Vec<i64> = order
            .iter()
            .copied()
            .filter(|id| ranked.contains(id))
            .chain(before.iter().map(|item| item.id).filter(|id| !ranked.contains(id)))
            .collect();
        apply_order(tx, roles, &before, &full)
    })?;

    tracing::info!(account_id, moved = changes.len(), "reordered queue");
    Ok(changes)
}

/// Drag one item to 1-based rank `to` (clamped to the queue length).
///
/// # Errors
///
/// [`QueueError::ItemNotFound`], a validation error for completed items,
/// and store errors.
pub fn move_item(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
    item_id: i64,
    to: u32,
) -> Result<WorkItem, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;
    let roles = catalog.roles();

    let item = run_unit(conn, options.retry, "move", |tx| {
        let before = account_items_in_rank_order(tx, account_id)?;
        let classes = rank_classes(&before, roles)?;
        match classes.get(&item_id) {
            None => return Err(QueueError::ItemNotFound(item_id)),
            Some(class) if !class.is_ranked() => {
                return Err(QueueError::invalid(
                    "item",
                    format!("item {item_id} is completed and has no queue position"),
                ));
            }
            Some(_) => {}
        }

        let ids: Vec<i64> = before.iter().map(|item| item.id).collect();
        let order = place(
            &ids,
            |id| classes.get(&id).is_some_and(|class| class.is_ranked()),
            item_id,
            to,
        );
        apply_order(tx, roles, &before, &order)?;
        get_item(tx, account_id, item_id)
    })?;

    tracing::info!(account_id, item_id, position = ?item.position, "moved work item");
    Ok(item)
}

/// Delete an item and close the gap it leaves in both rank sequences.
///
/// # Errors
///
/// [`QueueError::ItemNotFound`] and store errors.
pub fn delete_item(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
    item_id: i64,
) -> Result<WorkItem, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;

    let (deleted, reranked) = run_unit(conn, options.retry, "delete", |tx| {
        let item = get_item(tx, account_id, item_id)?;
        tx.execute(
            "DELETE FROM workqueue WHERE item_id = ?1 AND account_id = ?2",
            params![item_id, account_id],
        )?;

        let before = account_items_in_rank_order(tx, account_id)?;
        let order: Vec<i64> = before.iter().map(|item| item.id).collect();
        let changes = apply_order(tx, catalog.roles(), &before, &order)?;
        Ok((item, changes.len()))
    })?;

    tracing::info!(
        account_id,
        item_id,
        identifier = %deleted.identifier,
        reranked,
        "deleted work item"
    );
    Ok(deleted)
}

/// Reconcile an account in its persisted order, repairing any drift.
///
/// Running it on a consistent account changes nothing.
///
/// # Errors
///
/// [`QueueError::AccountNotFound`], integrity errors for unknown statuses,
/// and store errors.
pub fn recompute_account(
    conn: &mut Connection,
    cache: &mut LookupCache,
    options: &WriteOptions,
    account_id: i64,
) -> Result<RecomputeReport, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;

    let report = run_unit(conn, options.retry, "recompute", |tx| {
        ensure_account(tx, account_id)?;
        let before = account_items_in_rank_order(tx, account_id)?;
        let order: Vec<i64> = before.iter().map(|item| item.id).collect();
        let changes = apply_order(tx, catalog.roles(), &before, &order)?;
        Ok(RecomputeReport {
            account_id,
            examined: before.len(),
            changes,
        })
    })?;

    if report.changes.is_empty() {
        tracing::debug!(account_id, examined = report.examined, "ranks already consistent");
    } else {
        tracing::warn!(
            account_id,
            repaired = report.changes.len(),
            "repaired drifted queue ranks"
        );
    }
    Ok(report)
}

/// Check an account's ranks without writing anything.
///
/// # Errors
///
/// [`QueueError::AccountNotFound`], integrity errors for unknown statuses,
/// and store errors.
pub fn verify_account(
    conn: &Connection,
    cache: &mut LookupCache,
    account_id: i64,
) -> Result<Result<(), RankViolation>, QueueError> {
    ensure_account(conn, account_id)?;
    let catalog = cache.catalog(conn, account_id)?;
    let items = account_items_in_rank_order(conn, account_id)?;
    check_ranks(&items, catalog.roles())
}

/// Run `body` inside an immediate transaction, retrying the whole unit on
/// busy/locked failures.
fn run_unit<T>(
    conn: &mut Connection,
    retry: RetryPolicy,
    unit: &'static str,
    mut body: impl FnMut(&Connection) -> Result<T, QueueError>,
) -> Result<T, QueueError> {
    let mut attempt: u32 = 1;
    loop {
        match attempt_unit(conn, &mut body) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < retry.attempts => {
                tracing::warn!(unit, attempt, error = %err, "store busy, retrying unit");
                std::thread::sleep(retry.backoff * attempt);
                attempt += 1;
            }
            Err(err) => {
                if err.is_integrity() {
                    tracing::error!(unit, error = %err, "workqueue integrity error");
                }
                return Err(err);
            }
        }
    }
}

fn attempt_unit<T>(
    conn: &mut Connection,
    body: &mut impl FnMut(&Connection) -> Result<T, QueueError>,
) -> Result<T, QueueError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = body(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Reconcile `before` in the given id order and persist the ranks that
/// moved. Returns the changes written.
fn apply_order(
    conn: &Connection,
    roles: &StatusRoles,
    before: &[WorkItem],
    order: &[i64],
) -> Result<Vec<RankChange>, QueueError> {
    let by_id: HashMap<i64, &WorkItem> = before.iter().map(|item| (item.id, item)).collect();
    let ordered = order
        .iter()
        .map(|id| {
            by_id
                .get(id)
                .map(|item| (*item).clone())
                .ok_or_else(|| QueueError::Integrity(format!("item {id} vanished during the unit")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if ordered.len() != before.len() {
        return Err(QueueError::Integrity(format!(
            "rank order lists {} of {} items",
            ordered.len(),
            before.len()
        )));
    }

    let after = reconcile(ordered, roles)?;
    let changes = rank_changes(before, &after);
    persist_ranks(conn, &changes)?;
    Ok(changes)
}

fn persist_ranks(conn: &Connection, changes: &[RankChange]) -> Result<(), QueueError> {
    if changes.is_empty() {
        return Ok(());
    }
    let mut stmt = conn.prepare_cached(
        "UPDATE workqueue SET position = ?1, external_queue_position = ?2 WHERE item_id = ?3",
    )?;
    for change in changes {
        stmt.execute(params![change.position, change.external_queue_position, change.id])?;
    }
    tracing::debug!(rows = changes.len(), "persisted rank changes");
    Ok(())
}

fn rank_classes(
    items: &[WorkItem],
    roles: &StatusRoles,
) -> Result<HashMap<i64, RankClass>, QueueError> {
    items
        .iter()
        .map(|item| {
            roles
                .require_role(item.id, item.status_id)
                .map(|role| (item.id, RankClass::of(role)))
        })
        .collect()
}

fn ensure_account(conn: &Connection, account_id: i64) -> Result<(), QueueError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_id = ?1)",
        params![account_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(QueueError::AccountNotFound(account_id.to_string()))
    }
}

fn in_use(identifier: &str, return_year: i32) -> QueueError {
    QueueError::IdentifierInUse {
        identifier: identifier.to_string(),
        return_year,
    }
}

fn map_write_error(err: rusqlite::Error, identifier: &str, return_year: i32) -> QueueError {
    if is_unique_violation(&err) {
        in_use(identifier, return_year)
    } else {
        err.into()
    }
}
