//! `tq delete`: remove a work item and close its gap in the queue.

use super::{Globals, ItemView, Session};
use crate::output::render;
use anyhow::Result;
use clap::Args;
use std::io::Write;
use taxq_core::db::workqueue::delete_item;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Item id.
    pub id: i64,
}

pub fn run_delete(args: &DeleteArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;

    let deleted = delete_item(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
        args.id,
    )?;

    if globals.quiet && !globals.output.is_json() {
        return Ok(());
    }
    let view = ItemView::new(deleted, &catalog);
    render(globals.output, &view, |view, w| {
        writeln!(
            w,
            "Deleted #{} {} ({}).",
            view.item.id, view.item.identifier, view.item.return_year
        )
    })
}
