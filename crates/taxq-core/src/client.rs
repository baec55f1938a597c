//! The client-facing status lookup.
//!
//! Clients know three things about their filing: the firm's subdomain,
//! the return year, and the identifier their preparer gave them. The
//! projection exposes the external status name and the client queue
//! position, never staff-side fields such as notes or internal ranks.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::accounts::find_account_by_subdomain;
use crate::db::query::find_item_by_identifier;
use crate::error::QueueError;
use crate::lookup::LookupCache;
use crate::model::status::StatusRole;

/// What a client sees for one filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    pub status: String,
    pub queue_position: Option<u32>,
    pub extension: Option<String>,
    pub message: String,
}

/// Project one filing for its client.
///
/// # Errors
///
/// [`QueueError::AccountNotFound`] for an unknown subdomain,
/// [`QueueError::ReturnNotFound`] when no filing matches, and integrity
/// errors when the filing's status is not in the catalog.
pub fn client_status(
    conn: &Connection,
    cache: &mut LookupCache,
    subdomain: &str,
    return_year: i32,
    identifier: &str,
) -> Result<ClientStatus, QueueError> {
    let account = find_account_by_subdomain(conn, subdomain)?
        .ok_or_else(|| QueueError::AccountNotFound(subdomain.trim().to_string()))?;
    let not_found = || QueueError::ReturnNotFound {
        identifier: identifier.trim().to_string(),
        return_year,
    };
    let item = find_item_by_identifier(conn, account.id, return_year, identifier)?
        .ok_or_else(not_found)?;

    let catalog = cache.catalog(conn, account.id)?;
    let status = catalog.status(item.status_id).ok_or(QueueError::UnknownStatus {
        item_id: item.id,
        status_id: item.status_id,
    })?;

    let extension = if catalog.roles().role_of(status.id) == Some(StatusRole::Extended) {
        item.extension_date_id
            .and_then(|id| catalog.extension(id))
            .map(|option| option.name.clone())
    } else {
        None
    };

    let message = client_message(&status.name_external, item.external_queue_position, extension.as_deref());
    tracing::debug!(
        account_id = account.id,
        item_id = item.id,
        queue_position = ?item.external_queue_position,
        "client status lookup"
    );

    Ok(ClientStatus {
        status: status.name_external.clone(),
        queue_position: item.external_queue_position,
        extension,
        message,
    })
}

/// The single sentence shown to the client.
#[must_use]
pub fn client_message(status: &str, queue_position: Option<u32>, extension: Option<&str>) -> String {
    match (queue_position, extension) {
        (Some(n), _) => format!("{status} \u{2014} you are number {n} in the queue."),
        (None, Some(option)) => format!("{status} (extended to {option})"),
        (None, None) => status.to_string(),
    }
}
