//! Loaders and writers for the shared lookup catalogs.

use rusqlite::{Connection, params};

use crate::error::{QueueError, is_unique_violation};
use crate::lookup::LookupCache;
use crate::model::status::{ExtensionOption, Status};

/// All statuses, ordered by id.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn load_statuses(conn: &Connection) -> Result<Vec<Status>, QueueError> {
    let mut stmt = conn.prepare(
        "SELECT status_id, name_internal, name_external, severity_color, status_category \
         FROM statuses ORDER BY status_id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Status {
            id: row.get(0)?,
            name_internal: row.get(1)?,
            name_external: row.get(2)?,
            severity_color: row.get(3)?,
            status_category: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// All extension options, ordered by id.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn load_extension_options(conn: &Connection) -> Result<Vec<ExtensionOption>, QueueError> {
    let mut stmt = conn.prepare(
        "SELECT extension_date_id, name FROM extension_date_options ORDER BY extension_date_id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ExtensionOption {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Add an extension option and invalidate every cached catalog.
///
/// # Errors
///
/// Returns a validation error for a blank or duplicate name, or a store error.
pub fn add_extension_option(
    conn: &Connection,
    cache: &mut LookupCache,
    name: &str,
) -> Result<ExtensionOption, QueueError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QueueError::invalid("extension", "name must not be empty"));
    }

    match conn.execute(
        "INSERT INTO extension_date_options (name) VALUES (?1)",
        params![name],
    ) {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(QueueError::invalid(
                "extension",
                format!("an extension date named '{name}' already exists"),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    cache.invalidate_all();
    let option = ExtensionOption {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    };
    tracing::info!(id = option.id, name = %option.name, "added extension date option");
    Ok(option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn seeded_catalogs_load_in_id_order() {
        let conn = db::open_in_memory().expect("store");
        let statuses = load_statuses(&conn).expect("statuses");
        let ids: Vec<i64> = statuses.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 10]);

        let options = load_extension_options(&conn).expect("options");
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].name, "October 15");
    }

    #[test]
    fn adding_option_invalidates_cache() {
        let conn = db::open_in_memory().expect("store");
        let mut cache = LookupCache::new();
        let before = cache.catalog(&conn, 1).expect("catalog");
        assert_eq!(before.extension_options().len(), 2);

        let option = add_extension_option(&conn, &mut cache, " March 15 ").expect("add");
        assert_eq!(option.name, "March 15");

        let after = cache.catalog(&conn, 1).expect("catalog");
        assert_eq!(after.extension_options().len(), 3);
        assert!(after.extension(option.id).is_some());
    }

    #[test]
    fn duplicate_or_blank_option_is_rejected() {
        let conn = db::open_in_memory().expect("store");
        let mut cache = LookupCache::new();
        assert!(add_extension_option(&conn, &mut cache, "October 15").is_err());
        assert!(add_extension_option(&conn, &mut cache, "   ").is_err());
    }
}
