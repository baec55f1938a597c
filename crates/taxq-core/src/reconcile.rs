//! Queue reconciliation: assigning dense ranks to an ordered queue.
//!
//! A queue has two rank sequences. `position` orders every filing staff
//! still has to work on. `external_queue_position` orders only the filings
//! the client-facing lookup reports as waiting in line (the Received ones).
//!
//! [`reconcile`] never reorders anything. Callers decide the order (the
//! persisted rank order, or a new order from a drag) and reconciliation
//! only stamps ranks onto it, so running it twice gives the same result.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::QueueError;
use crate::model::item::WorkItem;
use crate::model::status::{StatusRole, StatusRoles};

/// How a status participates in the two rank sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankClass {
    /// No rank in either sequence (completed filings).
    Unranked,
    /// Ranked internally and shown to the client (received filings).
    ClientVisible,
    /// Ranked internally only.
    StaffOnly,
}

impl RankClass {
    #[must_use]
    pub const fn of(role: StatusRole) -> Self {
        match role {
            StatusRole::Completed => Self::Unranked,
            StatusRole::Received => Self::ClientVisible,
            StatusRole::AwaitingInfo
            | StatusRole::Extended
            | StatusRole::Mailed
            | StatusRole::Other => Self::StaffOnly,
        }
    }

    #[must_use]
    pub const fn is_ranked(self) -> bool {
        !matches!(self, Self::Unranked)
    }
}

/// Stamp both rank sequences onto `items`, in their given order.
///
/// # Errors
///
/// Returns [`QueueError::UnknownStatus`] if any item's status is not in the
/// catalog. Nothing is guessed.
pub fn reconcile(mut items: Vec<WorkItem>, roles: &StatusRoles) -> Result<Vec<WorkItem>, QueueError> {
    let mut next_pos: u32 = 0;
    let mut next_ext: u32 = 0;

    for item in &mut items {
        let role = roles.require_role(item.id, item.status_id)?;
        match RankClass::of(role) {
            RankClass::Unranked => {
                item.position = None;
                item.external_queue_position = None;
            }
            RankClass::ClientVisible => {
                next_pos += 1;
                next_ext += 1;
                item.position = Some(next_pos);
                item.external_queue_position = Some(next_ext);
            }
            RankClass::StaffOnly => {
                next_pos += 1;
                item.position = Some(next_pos);
                item.external_queue_position = None;
            }
        }
    }

    Ok(items)
}

/// New ranks for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub id: i64,
    pub position: Option<u32>,
    pub external_queue_position: Option<u32>,
}

/// Rows of `after` whose ranks differ from `before` (or that are new).
#[must_use]
pub fn rank_changes(before: &[WorkItem], after: &[WorkItem]) -> Vec<RankChange> {
    let previous: HashMap<i64, (Option<u32>, Option<u32>)> =
        before.iter().map(|item| (item.id, item.ranks())).collect();

    after
        .iter()
        .filter(|item| previous.get(&item.id) != Some(&item.ranks()))
        .map(|item| RankChange {
            id: item.id,
            position: item.position,
            external_queue_position: item.external_queue_position,
        })
        .collect()
}

/// A broken rank invariant, as found by [`check_ranks`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankViolation {
    #[error("completed item {id} still holds a rank")]
    CompletedRanked { id: i64 },

    #[error("item {id} is queued but has no position")]
    MissingPosition { id: i64 },

    #[error("received item {id} has no client queue position")]
    MissingExternal { id: i64 },

    #[error("item {id} is not received but has a client queue position")]
    UnexpectedExternal { id: i64 },

    #[error("positions are not 1..={expected}: found {found:?}")]
    PositionsNotDense { expected: usize, found: Vec<u32> },

    #[error("client queue positions are not 1..={expected}: found {found:?}")]
    ExternalNotDense { expected: usize, found: Vec<u32> },
}

/// Verify the rank invariants over one account's items.
///
/// # Errors
///
/// Returns `Ok(Err(violation))` for the first broken invariant, and
/// `Err` when an item's status is not in the catalog.
pub fn check_ranks(
    items: &[WorkItem],
    roles: &StatusRoles,
) -> Result<Result<(), RankViolation>, QueueError> {
    let mut positions = Vec::new();
    let mut externals = Vec::new();

    for item in items {
        let class = RankClass::of(roles.require_role(item.id, item.status_id)?);
        match (class, item.position, item.external_queue_position) {
            (RankClass::Unranked, None, None) => {}
            (RankClass::Unranked, _, _) => {
                return Ok(Err(RankViolation::CompletedRanked { id: item.id }));
            }
            (_, None, _) => return Ok(Err(RankViolation::MissingPosition { id: item.id })),
            (RankClass::ClientVisible, Some(_), None) => {
                return Ok(Err(RankViolation::MissingExternal { id: item.id }));
            }
            (RankClass::StaffOnly, Some(_), Some(_)) => {
                return Ok(Err(RankViolation::UnexpectedExternal { id: item.id }));
            }
            (_, Some(pos), ext) => {
                positions.push(pos);
                externals.extend(ext);
            }
        }
    }

    if !is_dense(&mut positions) {
        return Ok(Err(RankViolation::PositionsNotDense {
            expected: positions.len(),
            found: positions,
        }));
    }
    if !is_dense(&mut externals) {
        return Ok(Err(RankViolation::ExternalNotDense {
            expected: externals.len(),
            found: externals,
        }));
    }
    Ok(Ok(()))
}

fn is_dense(ranks: &mut [u32]) -> bool {
    ranks.sort_unstable();
    ranks
        .iter()
        .zip(1_u32..)
        .all(|(rank, expected)| *rank == expected)
}

/// Move `id` so it lands at 1-based rank `to` among the ranked entries of
/// `order`, keeping every other entry in its relative order.
///
/// `to` is clamped to the available slots; an id absent from `order` is
/// appended behind the last ranked entry.
#[must_use]
pub fn place(order: &[i64], is_ranked: impl Fn(i64) -> bool, id: i64, to: u32) -> Vec<i64> {
    let mut rest: Vec<i64> = order.iter().copied().filter(|other| *other != id).collect();
    let target = usize::try_from(to.max(1)).unwrap_or(usize::MAX) - 1;

    let mut seen = 0_usize;
    let mut insert_at = None;
    let mut after_last_ranked = 0_usize;
    for (index, other) in rest.iter().enumerate() {
        if is_ranked(*other) {
            if seen == target {
                insert_at = Some(index);
                break;
            }
            seen += 1;
            after_last_ranked = index + 1;
        }
    }

    rest.insert(insert_at.unwrap_or(after_last_ranked), id);
    rest
}

/// Check that a caller-supplied order lists every ranked item exactly once
/// and nothing from outside the queue.
///
/// # Errors
///
/// Returns a validation error naming the first problem found.
pub fn validate_order(
    supplied: &[i64],
    known: &HashSet<i64>,
    ranked: &HashSet<i64>,
) -> Result<(), QueueError> {
    let mut seen = HashSet::with_capacity(supplied.len());
    for id in supplied {
        if !known.contains(id) {
            return Err(QueueError::invalid(
                "order",
                format!("item {id} is not in this account's queue"),
            ));
        }
        if !seen.insert(*id) {
            return Err(QueueError::invalid("order", format!("item {id} is listed twice")));
        }
    }

    let mut missing: Vec<i64> = ranked.difference(&seen).copied().collect();
    missing.sort_unstable();
    if let Some(first) = missing.first() {
        return Err(QueueError::invalid(
            "order",
            format!(
                "every queued item must be listed; {} missing (first: {first})",
                missing.len()
            ),
        ));
    }
    Ok(())
}
