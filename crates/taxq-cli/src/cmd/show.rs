use super::{Globals, ItemView, Session};
use crate::output::render_item;
use anyhow::Result;
use clap::Args;
use taxq_core::db::query::get_item;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Item id.
    pub id: i64,
}

pub fn run_show(args: &ShowArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;
    let item = get_item(&session.conn, account.id, args.id)?;
    render_item(&ItemView::new(item, &catalog), globals.output)?;
    Ok(())
}
