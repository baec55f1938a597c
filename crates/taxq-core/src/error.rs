use std::fmt;

use crate::model::status::StatusRole;

/// Machine-readable error codes for scripts and the JSON output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    AccountNotFound,
    ItemNotFound,
    ReturnNotFound,
    InvalidField,
    ExtensionRequired,
    ExtensionNotAllowed,
    IdentifierInUse,
    UnknownStatus,
    MissingStatusRole,
    CorruptStore,
    StoreBusy,
    StoreFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::AccountNotFound => "E2001",
            Self::ItemNotFound => "E2002",
            Self::ReturnNotFound => "E2003",
            Self::InvalidField => "E3001",
            Self::ExtensionRequired => "E3002",
            Self::ExtensionNotAllowed => "E3003",
            Self::IdentifierInUse => "E4001",
            Self::UnknownStatus => "E5001",
            Self::MissingStatusRole => "E5002",
            Self::CorruptStore => "E5003",
            Self::StoreBusy => "E6001",
            Self::StoreFailure => "E6002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::AccountNotFound => "Account not found",
            Self::ItemNotFound => "Work item not found",
            Self::ReturnNotFound => "No return matches that identifier",
            Self::InvalidField => "Invalid field value",
            Self::ExtensionRequired => "Extension date required",
            Self::ExtensionNotAllowed => "Extension date not allowed",
            Self::IdentifierInUse => "Identifier already in use",
            Self::UnknownStatus => "Unknown status",
            Self::MissingStatusRole => "Status catalog incomplete",
            Self::CorruptStore => "Corrupt workqueue store",
            Self::StoreBusy => "Store busy",
            Self::StoreFailure => "Store failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint surfaced to staff users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tq init` to create the workqueue store."),
            Self::ConfigParseError => Some("Fix syntax in .taxq/config.toml and retry."),
            Self::AccountNotFound => {
                Some("Pass --account, set TAXQ_ACCOUNT, or create one with `tq account add`.")
            }
            Self::ItemNotFound => Some("List the queue with `tq list --all` to find item ids."),
            Self::ReturnNotFound => Some("Check the identifier and return year with your preparer."),
            Self::InvalidField => None,
            Self::ExtensionRequired => {
                Some("Pick an extension date with --extension (see `tq lookups list`).")
            }
            Self::ExtensionNotAllowed => {
                Some("Only filings in the Extended status carry an extension date.")
            }
            Self::IdentifierInUse => {
                Some("Choose another identifier for this return year (see `tq check-id`).")
            }
            Self::UnknownStatus => Some("Run `tq lookups list` and repair the item's status."),
            Self::MissingStatusRole => {
                Some("The statuses table must define Received, Extended and Completed.")
            }
            Self::CorruptStore => Some("Run `tq recompute` to repair queue positions."),
            Self::StoreBusy => Some("Retry after the other `tq` process finishes its write."),
            Self::StoreFailure => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by workqueue operations.
///
/// Variants fall into four families: validation (caught before any write),
/// conflicts (identifier uniqueness), integrity (catalog or rank data the
/// store should never contain), and store failures. Only
/// [`QueueError::Transient`] is worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("status '{status}' requires an extension date")]
    ExtensionRequired { status: String },

    #[error("extension date is only allowed for the Extended status, not '{status}'")]
    ExtensionNotAllowed { status: String },

    #[error("identifier '{identifier}' is already in use for return year {return_year}")]
    IdentifierInUse { identifier: String, return_year: i32 },

    #[error("work item {item_id} has status id {status_id}, which is not a known status")]
    UnknownStatus { item_id: i64, status_id: i64 },

    #[error("status catalog has no status for the {0} role")]
    MissingStatusRole(StatusRole),

    #[error("workqueue integrity violation: {0}")]
    Integrity(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("work item not found: {0}")]
    ItemNotFound(i64),

    #[error("no return found for identifier '{identifier}' in {return_year}")]
    ReturnNotFound { identifier: String, return_year: i32 },

    #[error("store busy: {0}")]
    Transient(#[source] rusqlite::Error),

    #[error("store error: {0}")]
    Store(#[source] rusqlite::Error),
}

impl QueueError {
    /// Shorthand for a field validation failure.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::InvalidField,
            Self::ExtensionRequired { .. } => ErrorCode::ExtensionRequired,
            Self::ExtensionNotAllowed { .. } => ErrorCode::ExtensionNotAllowed,
            Self::IdentifierInUse { .. } => ErrorCode::IdentifierInUse,
            Self::UnknownStatus { .. } => ErrorCode::UnknownStatus,
            Self::MissingStatusRole(_) => ErrorCode::MissingStatusRole,
            Self::Integrity(_) => ErrorCode::CorruptStore,
            Self::AccountNotFound(_) => ErrorCode::AccountNotFound,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::ReturnNotFound { .. } => ErrorCode::ReturnNotFound,
            Self::Transient(_) => ErrorCode::StoreBusy,
            Self::Store(_) => ErrorCode::StoreFailure,
        }
    }

    /// Remediation hint for this error, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// True when the whole unit can be retried from a fresh read.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// True for errors that point at corrupt data rather than bad input.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownStatus { .. } | Self::MissingStatusRole(_) | Self::Integrity(_)
        )
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        if is_busy(&err) {
            Self::Transient(err)
        } else {
            Self::Store(err)
        }
    }
}

/// True for SQLite busy/locked failures.
#[must_use]
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

/// True when SQLite rejected a write because of a UNIQUE constraint.
#[must_use]
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, QueueError, is_busy, is_unique_violation};
    use std::collections::HashSet;

    const ALL: [ErrorCode; 15] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::AccountNotFound,
        ErrorCode::ItemNotFound,
        ErrorCode::ReturnNotFound,
        ErrorCode::InvalidField,
        ErrorCode::ExtensionRequired,
        ErrorCode::ExtensionNotAllowed,
        ErrorCode::IdentifierInUse,
        ErrorCode::UnknownStatus,
        ErrorCode::MissingStatusRole,
        ErrorCode::CorruptStore,
        ErrorCode::StoreBusy,
        ErrorCode::StoreFailure,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let code = code.code();
            assert_eq!(code.len(), 5);
            assert!(code.starts_with('E'));
            assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(is_busy(&busy));
        let err = QueueError::from(busy);
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::StoreBusy);

        let conflict = QueueError::IdentifierInUse {
            identifier: "AB12".into(),
            return_year: 2024,
        };
        assert!(!conflict.is_retryable());
        assert_eq!(conflict.code().code(), "E4001");
    }

    #[test]
    fn unique_violation_is_detected_from_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .expect("setup");
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .expect_err("duplicate insert must fail");
        assert!(is_unique_violation(&err));
        assert!(!is_busy(&err));
    }

    #[test]
    fn integrity_errors_are_classified() {
        assert!(QueueError::UnknownStatus { item_id: 1, status_id: 99 }.is_integrity());
        assert!(!QueueError::invalid("identifier", "empty").is_integrity());
    }
}
