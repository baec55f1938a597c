//! Tenant accounts.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{from_us, now_us};
use crate::error::{QueueError, is_unique_violation};
use crate::model::account::Account;
use crate::validate::{normalize_subdomain, validate_display_name};

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        subdomain: row.get(1)?,
        display_name: row.get(2)?,
        created_at: from_us(row.get(3)?),
    })
}

/// Create an account.
///
/// # Errors
///
/// Returns a validation error for a malformed or taken subdomain or an
/// empty display name.
pub fn create_account(
    conn: &Connection,
    subdomain: &str,
    display_name: &str,
) -> Result<Account, QueueError> {
    let subdomain = normalize_subdomain(subdomain)?;
    validate_display_name(display_name)?;
    let display_name = display_name.trim();
    let created_at_us = now_us();

    match conn.execute(
        "INSERT INTO accounts (subdomain, display_name, created_at_us) VALUES (?1, ?2, ?3)",
        params![subdomain, display_name, created_at_us],
    ) {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(QueueError::invalid(
                "subdomain",
                format!("'{subdomain}' is already taken"),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    let account = Account {
        id: conn.last_insert_rowid(),
        subdomain,
        display_name: display_name.to_string(),
        created_at: from_us(created_at_us),
    };
    tracing::info!(account_id = account.id, subdomain = %account.subdomain, "created account");
    Ok(account)
}

/// Find an account by subdomain (case-insensitive).
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn find_account_by_subdomain(
    conn: &Connection,
    subdomain: &str,
) -> Result<Option<Account>, QueueError> {
    let subdomain = subdomain.trim().to_ascii_lowercase();
    Ok(conn
        .query_row(
            "SELECT account_id, subdomain, display_name, created_at_us \
             FROM accounts WHERE subdomain = ?1",
            params![subdomain],
            row_to_account,
        )
        .optional()?)
}

/// Resolve an account handle: a numeric id or a subdomain.
///
/// Subdomains are never all digits, so the two forms cannot collide.
///
/// # Errors
///
/// Returns [`QueueError::AccountNotFound`] when nothing matches.
pub fn find_account(conn: &Connection, handle: &str) -> Result<Account, QueueError> {
    let handle = handle.trim();
    let found = if let Ok(id) = handle.parse::<i64>() {
        conn.query_row(
            "SELECT account_id, subdomain, display_name, created_at_us \
             FROM accounts WHERE account_id = ?1",
            params![id],
            row_to_account,
        )
        .optional()?
    } else {
        find_account_by_subdomain(conn, handle)?
    };
    found.ok_or_else(|| QueueError::AccountNotFound(handle.to_string()))
}

/// All accounts, ordered by subdomain.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, QueueError> {
    let mut stmt = conn.prepare(
        "SELECT account_id, subdomain, display_name, created_at_us \
         FROM accounts ORDER BY subdomain ASC",
    )?;
    let rows = stmt.query_map([], row_to_account)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
