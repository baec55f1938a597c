//! Canonical SQLite schema for the workqueue store.
//!
//! - `accounts` holds tenants, addressed publicly by `subdomain`
//! - `statuses` and `extension_date_options` are shared lookup catalogs
//! - `workqueue` holds one row per tax filing; `(account_id, return_year,
//!   identifier)` is UNIQUE so concurrent creates cannot both win
//! - `store_meta` tracks the schema version
//!
//! v3 adds `workqueue.completed_at_us`, stamped when a filing enters the
//! Completed status and cleared when it leaves.

/// Migration v1: tables, constraints, and the seeded catalogs.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    account_id INTEGER PRIMARY KEY AUTOINCREMENT,
    subdomain TEXT NOT NULL UNIQUE CHECK (length(subdomain) BETWEEN 1 AND 63),
    display_name TEXT NOT NULL CHECK (length(trim(display_name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS statuses (
    status_id INTEGER PRIMARY KEY,
    name_internal TEXT NOT NULL CHECK (length(trim(name_internal)) > 0),
    name_external TEXT NOT NULL,
    severity_color TEXT,
    status_category INTEGER
);

CREATE TABLE IF NOT EXISTS extension_date_options (
    extension_date_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0)
);

CREATE TABLE IF NOT EXISTS workqueue (
    item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    identifier TEXT NOT NULL CHECK (length(identifier) > 0 AND identifier = trim(identifier)),
    return_year INTEGER NOT NULL,
    status_id INTEGER NOT NULL REFERENCES statuses(status_id),
    position INTEGER CHECK (position IS NULL OR position > 0),
    external_queue_position INTEGER
        CHECK (external_queue_position IS NULL OR external_queue_position > 0),
    extension_date_id INTEGER REFERENCES extension_date_options(extension_date_id),
    received_at_us INTEGER NOT NULL,
    last_updated_at_us INTEGER NOT NULL,
    last_updated_by TEXT,
    notes TEXT,
    UNIQUE (account_id, return_year, identifier)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST((julianday('now') - 2440587.5) * 86400000000 AS INTEGER));

INSERT OR IGNORE INTO statuses
    (status_id, name_internal, name_external, severity_color, status_category)
VALUES
    (1, 'Received', 'Received and waiting in line', 'info', 1),
    (2, 'In Progress', 'Being prepared', 'secondary', 2),
    (3, 'Awaiting Info', 'Waiting on information from you', 'warning', 2),
    (4, 'Extended', 'Extended', 'danger', 2),
    (5, 'Mailed', 'Mailed to you for signature', 'contrast', 2),
    (10, 'Completed', 'Completed', 'success', 3);

INSERT OR IGNORE INTO extension_date_options (extension_date_id, name)
VALUES
    (1, 'September 15'),
    (2, 'October 15');
";

/// Migration v2: read-path indexes for rank-ordered listing and stats.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_workqueue_account_rank
    ON workqueue(account_id, position, item_id);

CREATE INDEX IF NOT EXISTS idx_workqueue_account_status
    ON workqueue(account_id, status_id);

CREATE INDEX IF NOT EXISTS idx_workqueue_account_year
    ON workqueue(account_id, return_year);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Migration v3: completion timestamps. Existing unranked rows take their
/// last update as the best known completion time.
pub const MIGRATION_V3_SQL: &str = r"
ALTER TABLE workqueue ADD COLUMN completed_at_us INTEGER;

UPDATE workqueue
SET completed_at_us = last_updated_at_us
WHERE position IS NULL;

UPDATE store_meta
SET schema_version = 3
WHERE id = 1;
";

/// Indexes expected by list/stats query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_workqueue_account_rank",
    "idx_workqueue_account_status",
    "idx_workqueue_account_year",
];
