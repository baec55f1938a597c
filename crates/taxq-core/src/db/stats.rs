//! Dashboard counters for one account.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::query::{ItemFilter, list_items, max_external_position, max_position};
use crate::error::QueueError;
use crate::lookup::LookupCache;
use crate::model::status::StatusRole;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Count of items in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status_id: i64,
    pub name: String,
    pub count: usize,
}

/// Aggregate queue figures.
///
/// Counts honor the optional return-year filter. The two queue lengths are
/// account-wide, since ranks are dense across return years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub account_id: i64,
    pub return_year: Option<i32>,
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub staff_queue_length: u32,
    pub client_queue_length: u32,
    /// Every catalog status in id order, including empty ones.
    pub by_status: Vec<StatusCount>,
    /// Mean days from receipt to completion, over completed items. Edits
    /// made after completion do not move it.
    pub avg_processing_days: Option<f64>,
    /// Age in whole days of the longest-waiting active item.
    pub oldest_active_days: Option<i64>,
    /// Share of active items still in the Received status, `0.0..=1.0`.
    pub received_share: Option<f64>,
}

/// Compute [`QueueStats`] at the current time.
///
/// # Errors
///
/// Integrity errors for items in unknown statuses, and store errors.
pub fn queue_stats(
    conn: &Connection,
    cache: &mut LookupCache,
    account_id: i64,
    return_year: Option<i32>,
) -> Result<QueueStats, QueueError> {
    queue_stats_at(conn, cache, account_id, return_year, Utc::now())
}

#[allow(clippy::cast_precision_loss)]
fn queue_stats_at(
    conn: &Connection,
    cache: &mut LookupCache,
    account_id: i64,
    return_year: Option<i32>,
    now: DateTime<Utc>,
) -> Result<QueueStats, QueueError> {
    let catalog = cache.catalog(conn, account_id)?;
    let roles = catalog.roles();
    let items = list_items(
        conn,
        account_id,
        &ItemFilter {
            return_year,
            include_completed: true,
            ..ItemFilter::default()
        },
    )?;

    let mut by_status: Vec<StatusCount> = catalog
        .statuses()
        .iter()
        .map(|status| StatusCount {
            status_id: status.id,
            name: status.name_internal.clone(),
            count: 0,
        })
        .collect();

    let mut completed = 0_usize;
    let mut received = 0_usize;
    let mut processing_secs = 0_i64;
    let mut oldest: Option<DateTime<Utc>> = None;

    for item in &items {
        let role = roles.require_role(item.id, item.status_id)?;
        if let Some(slot) = by_status.iter_mut().find(|s| s.status_id == item.status_id) {
            slot.count += 1;
        }
        if role == StatusRole::Completed {
            completed += 1;
            let done_at = item.completed_at.unwrap_or(item.last_updated_at);
            processing_secs += (done_at - item.received_at).num_seconds().max(0);
            continue;
        }
        if role == StatusRole::Received {
            received += 1;
        }
        oldest = Some(oldest.map_or(item.received_at, |at| at.min(item.received_at)));
    }

    let total = items.len();
    let active = total - completed;

    Ok(QueueStats {
        account_id,
        return_year,
        total,
        active,
        completed,
        staff_queue_length: max_position(conn, account_id)?,
        client_queue_length: max_external_position(conn, account_id)?,
        by_status,
        avg_processing_days: (completed > 0)
            .then(|| processing_secs as f64 / SECONDS_PER_DAY / completed as f64),
        oldest_active_days: oldest.map(|at| (now - at).num_days().max(0)),
        received_share: (active > 0).then(|| received as f64 / active as f64),
    })
}
