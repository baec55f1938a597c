//! `tq list`: the queue in rank order.

use super::{Globals, ItemView, Session};
use crate::output::{OutputMode, render_list};
use anyhow::Result;
use clap::Args;
use taxq_core::db::query::{ItemFilter, list_items};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Status id or name.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Include completed returns.
    #[arg(short, long)]
    pub all: bool,

    /// Substring of the identifier or notes (case-insensitive).
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum rows.
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,
}

pub fn run_list(args: &ListArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;

    let filter = ItemFilter {
        return_year: args.year,
        status_id: match &args.status {
            Some(reference) => Some(catalog.resolve_status(reference)?.id),
            None => None,
        },
        include_completed: args.all,
        search: args.search.clone(),
        limit: args.limit,
    };
    let rows: Vec<ItemView> = list_items(&session.conn, account.id, &filter)?
        .into_iter()
        .map(|item| ItemView::new(item, &catalog))
        .collect();
    tracing::debug!(account_id = account.id, rows = rows.len(), "listed queue");

    if rows.is_empty() && globals.output != OutputMode::Json {
        if !globals.quiet {
            println!("Queue is empty.");
        }
        return Ok(());
    }
    render_list(&rows, globals.output)?;
    Ok(())
}
