//! `tq account`: manage tenant accounts.

use super::{Globals, Session, local_time};
use crate::output::{OutputMode, Renderable, pretty_kv, pretty_section, render_item, render_list};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::{self, Write};
use taxq_core::db::accounts::{create_account, list_accounts};
use taxq_core::model::Account;

#[derive(Args, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Create an account.
    Add {
        /// Public subdomain clients use for status lookups.
        subdomain: String,

        /// Firm name shown to staff.
        #[arg(long)]
        name: String,
    },
    /// List accounts.
    List,
}

struct AccountRow(Account);

impl Renderable for AccountRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} ({})", self.0.display_name, self.0.subdomain))?;
        pretty_kv(w, "Id", self.0.id.to_string())?;
        pretty_kv(w, "Created", local_time(self.0.created_at))?;
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, &self.0).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{:<6}  {:<20}  {}", self.0.id, self.0.subdomain, self.0.display_name)
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID    ", "SUBDOMAIN           ", "NAME"]
    }
}

pub fn run_account(args: &AccountArgs, globals: &Globals) -> Result<()> {
    let session = Session::open(&globals.project_root)?;
    match &args.command {
        AccountCommand::Add { subdomain, name } => {
            let account = create_account(&session.conn, subdomain, name)?;
            if globals.quiet && !globals.output.is_json() {
                println!("{}", account.id);
                return Ok(());
            }
            render_item(&AccountRow(account), globals.output)?;
        }
        AccountCommand::List => {
            let rows: Vec<AccountRow> =
                list_accounts(&session.conn)?.into_iter().map(AccountRow).collect();
            if rows.is_empty() && globals.output != OutputMode::Json {
                println!("No accounts. Create one with `tq account add <subdomain> --name <name>`.");
                return Ok(());
            }
            render_list(&rows, globals.output)?;
        }
    }
    Ok(())
}
