//! `tq edit`: change fields of one work item.
//!
//! A status change re-ranks the account in the same unit; other edits only
//! touch the row.

use super::{Globals, ItemView, Session, parse_received};
use crate::output::render_item;
use anyhow::Result;
use clap::Args;
use taxq_core::db::workqueue::update_item;
use taxq_core::model::WorkItemPatch;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Item id.
    pub id: i64,

    #[arg(short, long)]
    pub identifier: Option<String>,

    #[arg(short, long)]
    pub year: Option<i32>,

    /// New status (id or name).
    #[arg(short, long)]
    pub status: Option<String>,

    /// Extension date (id or name).
    #[arg(short, long, conflicts_with = "clear_extension")]
    pub extension: Option<String>,

    /// Remove the extension date.
    #[arg(long)]
    pub clear_extension: bool,

    /// YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub received: Option<String>,

    #[arg(long, conflicts_with = "clear_notes")]
    pub notes: Option<String>,

    #[arg(long)]
    pub clear_notes: bool,
}

impl EditArgs {
    #[allow(clippy::option_option)]
    fn notes_edit(&self) -> Option<Option<String>> {
        if self.clear_notes {
            Some(None)
        } else {
            self.notes.clone().map(Some)
        }
    }
}

pub fn run_edit(args: &EditArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;

    let extension_date_id = if args.clear_extension {
        Some(None)
    } else {
        match &args.extension {
            Some(reference) => Some(Some(catalog.resolve_extension(reference)?.id)),
            None => None,
        }
    };
    let patch = WorkItemPatch {
        identifier: args.identifier.clone(),
        return_year: args.year,
        status_id: match &args.status {
            Some(reference) => Some(catalog.resolve_status(reference)?.id),
            None => None,
        },
        extension_date_id,
        received_at: args.received.as_deref().map(parse_received).transpose()?,
        notes: args.notes_edit(),
    };

    let item = update_item(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
        args.id,
        &patch,
        globals.user.as_deref(),
    )?;

    if globals.quiet && !globals.output.is_json() {
        return Ok(());
    }
    render_item(&ItemView::new(item, &catalog), globals.output)?;
    Ok(())
}
