//! Edit-boundary validation. Everything here runs before any write.

use crate::error::QueueError;
use crate::model::status::{Status, StatusRole, StatusRoles};

pub const DEFAULT_IDENTIFIER_MAX_LEN: usize = 4;
pub const MIN_RETURN_YEAR: i32 = 1900;
pub const MAX_RETURN_YEAR: i32 = 2100;
pub const MAX_SUBDOMAIN_LEN: usize = 63;
pub const MAX_DISPLAY_NAME_LEN: usize = 120;

/// Trim and check a filing identifier, returning the stored form.
///
/// # Errors
///
/// Returns a validation error when the trimmed value is empty, longer than
/// `max_len` characters, or contains anything but ASCII letters and digits.
pub fn normalize_identifier(raw: &str, max_len: usize) -> Result<String, QueueError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(QueueError::invalid("identifier", "identifier is required"));
    }
    if value.chars().count() > max_len {
        return Err(QueueError::invalid(
            "identifier",
            format!("'{value}' is longer than {max_len} characters"),
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(QueueError::invalid(
            "identifier",
            format!("'{value}' must contain only letters and digits"),
        ));
    }
    Ok(value.to_string())
}

/// # Errors
///
/// Returns a validation error for years outside 1900..=2100.
pub fn validate_return_year(year: i32) -> Result<(), QueueError> {
    if (MIN_RETURN_YEAR..=MAX_RETURN_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(QueueError::invalid(
            "return_year",
            format!("{year} is outside {MIN_RETURN_YEAR}..={MAX_RETURN_YEAR}"),
        ))
    }
}

/// Normalize an account subdomain to its stored (lowercase) form.
///
/// # Errors
///
/// Returns a validation error unless the value is 1–63 characters of
/// `[a-z0-9-]` that neither starts nor ends with `-`. All-digit values are
/// rejected since numeric handles name account ids.
pub fn normalize_subdomain(raw: &str) -> Result<String, QueueError> {
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() || value.len() > MAX_SUBDOMAIN_LEN {
        return Err(QueueError::invalid(
            "subdomain",
            format!("must be 1..={MAX_SUBDOMAIN_LEN} characters"),
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(QueueError::invalid("subdomain", "must not start or end with '-'"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(QueueError::invalid(
            "subdomain",
            format!("'{value}' may only contain letters, digits and '-'"),
        ));
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(QueueError::invalid(
            "subdomain",
            format!("'{value}' must contain a letter or '-'"),
        ));
    }
    Ok(value)
}

/// # Errors
///
/// Returns a validation error for blank, overlong, or control-character names.
pub fn validate_display_name(name: &str) -> Result<(), QueueError> {
    let value = name.trim();
    if value.is_empty() {
        return Err(QueueError::invalid("display_name", "must not be empty"));
    }
    if value.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(QueueError::invalid(
            "display_name",
            format!("must be <= {MAX_DISPLAY_NAME_LEN} characters"),
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(QueueError::invalid("display_name", "must not contain control characters"));
    }
    Ok(())
}

/// Trim free-text notes; blank notes are stored as absent.
#[must_use]
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Enforce "extension date set iff status is Extended" for the state an
/// edit would produce.
///
/// # Errors
///
/// [`QueueError::ExtensionRequired`] for an Extended status without a date,
/// [`QueueError::ExtensionNotAllowed`] for a date on any other status.
pub fn check_extension(
    status: &Status,
    roles: &StatusRoles,
    extension_date_id: Option<i64>,
) -> Result<(), QueueError> {
    let extended = roles.role_of(status.id) == Some(StatusRole::Extended);
    match (extended, extension_date_id) {
        (true, None) => Err(QueueError::ExtensionRequired {
            status: status.name_internal.clone(),
        }),
        (false, Some(_)) => Err(QueueError::ExtensionNotAllowed {
            status: status.name_internal.clone(),
        }),
        _ => Ok(()),
    }
}
