//! `tq add`: put a new return into the workqueue.

use super::{Globals, ItemView, Session, parse_received};
use crate::output::render_item;
use anyhow::Result;
use clap::Args;
use taxq_core::db::workqueue::create_item;
use taxq_core::model::NewWorkItem;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Short filing code, unique per return year.
    #[arg(short, long)]
    pub identifier: String,

    /// Tax year of the return. Defaults to `queue.default_return_year`.
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Initial status (id or name). Defaults to Received.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Extension date (id or name); required with the Extended status.
    #[arg(short, long)]
    pub extension: Option<String>,

    /// When the return arrived: YYYY-MM-DD or RFC 3339. Defaults to now.
    #[arg(long)]
    pub received: Option<String>,

    /// Internal notes. Never shown to clients.
    #[arg(long)]
    pub notes: Option<String>,

    /// Insert at this 1-based rank instead of the tail of the queue.
    #[arg(long, value_name = "RANK", value_parser = clap::value_parser!(u32).range(1..))]
    pub at: Option<u32>,
}

pub fn run_add(args: &AddArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let catalog = session.catalog(account.id)?;

    let mut new = NewWorkItem::new(&args.identifier, session.return_year(args.year)?);
    if let Some(status) = &args.status {
        new.status_id = Some(catalog.resolve_status(status)?.id);
    }
    if let Some(extension) = &args.extension {
        new.extension_date_id = Some(catalog.resolve_extension(extension)?.id);
    }
    if let Some(received) = &args.received {
        new.received_at = Some(parse_received(received)?);
    }
    new.notes.clone_from(&args.notes);
    new.insert_at = args.at;

    let item = create_item(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
        &new,
        globals.user.as_deref(),
    )?;

    if globals.quiet && !globals.output.is_json() {
        println!("{}", item.id);
        return Ok(());
    }
    render_item(&ItemView::new(item, &catalog), globals.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AddArgs,
    }

    #[test]
    fn short_flags_parse() {
        let w = Wrapper::parse_from(["test", "-i", "AB12", "-y", "2024", "-s", "extended", "-e", "October 15"]);
        assert_eq!(w.args.identifier, "AB12");
        assert_eq!(w.args.year, Some(2024));
        assert_eq!(w.args.status.as_deref(), Some("extended"));
        assert_eq!(w.args.extension.as_deref(), Some("October 15"));
        assert_eq!(w.args.at, None);
    }

    #[test]
    fn rank_zero_is_rejected() {
        assert!(Wrapper::try_parse_from(["test", "-i", "AB12", "--at", "0"]).is_err());
        let w = Wrapper::parse_from(["test", "-i", "AB12", "--at", "1"]);
        assert_eq!(w.args.at, Some(1));
    }

    #[test]
    fn identifier_is_required() {
        assert!(Wrapper::try_parse_from(["test", "-y", "2024"]).is_err());
    }
}
