pub mod account;
pub mod add;
pub mod check_id;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod init;
pub mod list;
pub mod lookup;
pub mod lookups;
pub mod move_cmd;
pub mod recompute;
pub mod reorder;
pub mod show;
pub mod stats;

use crate::output::{OutputMode, Renderable, pretty_kv, pretty_section};
use anyhow::{Context as _, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use taxq_core::ErrorCode;
use taxq_core::config::{
    PROJECT_DIR, ProjectConfig, STORE_FILE, load_project_config, resolve_account_handle,
};
use taxq_core::db::accounts::find_account;
use taxq_core::db::try_open_store;
use taxq_core::db::workqueue::WriteOptions;
use taxq_core::lookup::{Catalog, LookupCache};
use taxq_core::model::{Account, WorkItem};

/// Flags every command sees.
#[derive(Debug, Clone)]
pub struct Globals {
    pub project_root: PathBuf,
    pub output: OutputMode,
    pub account: Option<String>,
    /// Acting staff member, already resolved.
    pub user: Option<String>,
    pub quiet: bool,
}

/// A CLI failure that carries a stable code but no library error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl CodedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CodedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodedError {}

pub fn store_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(STORE_FILE)
}

/// An open store plus what every unit needs alongside it.
pub struct Session {
    pub conn: Connection,
    pub cache: LookupCache,
    pub config: ProjectConfig,
    pub options: WriteOptions,
}

impl Session {
    /// Open the project's store, refusing to create one.
    pub fn open(project_root: &Path) -> Result<Self> {
        let config = load_project_config(project_root)
            .map_err(|e| CodedError::new(ErrorCode::ConfigParseError, format!("{e:#}")))?;
        let path = store_path(project_root);
        let conn = try_open_store(&path, &config.store)?.ok_or_else(|| {
            CodedError::new(
                ErrorCode::NotInitialized,
                format!("no workqueue store at {}", path.display()),
            )
        })?;
        tracing::debug!(store = %path.display(), "opened store");
        Ok(Self {
            conn,
            cache: LookupCache::new(),
            options: WriteOptions::from(&config),
            config,
        })
    }

    /// The account selected by `--account`, `TAXQ_ACCOUNT`, or the config.
    pub fn account(&self, flag: Option<&str>) -> Result<Account> {
        let handle = resolve_account_handle(flag, std::env::var("TAXQ_ACCOUNT").ok(), &self.config)
            .ok_or_else(|| {
                CodedError::new(ErrorCode::AccountNotFound, "no account selected")
            })?;
        Ok(find_account(&self.conn, &handle)?)
    }

    pub fn catalog(&mut self, account_id: i64) -> Result<std::sync::Arc<Catalog>> {
        Ok(self.cache.catalog(&self.conn, account_id)?)
    }

    /// `--year`, else `queue.default_return_year`.
    pub fn return_year(&self, flag: Option<i32>) -> Result<i32> {
        flag.or(self.config.queue.default_return_year).ok_or_else(|| {
            CodedError::new(
                ErrorCode::InvalidField,
                "invalid return_year: pass --year or set queue.default_return_year",
            )
            .into()
        })
    }
}

/// Parse `--received`: RFC 3339, or a bare date taken as midnight UTC.
pub fn parse_received(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        CodedError::new(
            ErrorCode::InvalidField,
            format!("invalid received_at: '{raw}' is not YYYY-MM-DD or RFC 3339"),
        )
    })?;
    date.and_hms_opt(0, 0, 0)
        .map(|at| at.and_utc())
        .context("midnight is always a valid time")
}

pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn rank(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// A work item with its catalog names resolved, as every command shows it.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: WorkItem,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl ItemView {
    pub fn new(item: WorkItem, catalog: &Catalog) -> Self {
        let status = catalog
            .status(item.status_id)
            .map_or_else(|| format!("#{}", item.status_id), |s| s.name_internal.clone());
        let extension = item
            .extension_date_id
            .and_then(|id| catalog.extension(id))
            .map(|option| option.name.clone());
        Self {
            item,
            status,
            extension,
        }
    }
}

impl Renderable for ItemView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let item = &self.item;
        pretty_section(w, &format!("#{} {} ({})", item.id, item.identifier, item.return_year))?;
        pretty_kv(w, "Status", &self.status)?;
        if let Some(extension) = &self.extension {
            pretty_kv(w, "Extended to", extension)?;
        }
        pretty_kv(w, "Position", rank(item.position))?;
        pretty_kv(w, "Client queue", rank(item.external_queue_position))?;
        pretty_kv(w, "Received", local_time(item.received_at))?;
        let updated = match &item.last_updated_by {
            Some(by) => format!("{} by {by}", local_time(item.last_updated_at)),
            None => local_time(item.last_updated_at),
        };
        pretty_kv(w, "Updated", updated)?;
        if let Some(at) = item.completed_at {
            pretty_kv(w, "Completed", local_time(at))?;
        }
        if let Some(notes) = &item.notes {
            pretty_kv(w, "Notes", notes)?;
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let item = &self.item;
        writeln!(
            w,
            "{:<6}  {:<4}  {:<6}  {:<10}  {:<4}  {}",
            item.id,
            rank(item.position),
            rank(item.external_queue_position),
            item.identifier,
            item.return_year,
            self.status
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID    ", "RANK", "CLIENT", "IDENTIFIER", "YEAR", "STATUS"]
    }
}
