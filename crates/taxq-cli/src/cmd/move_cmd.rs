//! `tq move`: drag one item to a new rank.

use super::{Globals, ItemView, Session};
use crate::output::render_item;
use anyhow::Result;
use clap::Args;
use taxq_core::db::workqueue::move_item;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Item id.
    pub id: i64,

    /// Target 1-based rank; values past the tail move to the tail.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub to: u32,
}

pub fn run_move(args: &MoveArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;

    let item = move_item(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
        args.id,
        args.to,
    )?;

    if globals.quiet && !globals.output.is_json() {
        return Ok(());
    }
    render_item(&ItemView::new(item, &catalog), globals.output)?;
    Ok(())
}
