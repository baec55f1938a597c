//! `tq lookups`: the shared status and extension-date catalogs.

use super::Session;
use crate::output::{OutputMode, pretty_section, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use taxq_core::db::lookups::{add_extension_option, load_extension_options, load_statuses};
use taxq_core::model::{ExtensionOption, Status, StatusRole};

#[derive(Args, Debug)]
pub struct LookupsArgs {
    #[command(subcommand)]
    pub command: LookupsCommand,
}

#[derive(Subcommand, Debug)]
pub enum LookupsCommand {
    /// Show statuses and extension dates.
    List,
    /// Add an extension date option.
    AddExtension {
        /// Display name, e.g. "October 15".
        name: String,
    },
}

#[derive(Debug, Serialize)]
struct StatusRow {
    #[serde(flatten)]
    status: Status,
    role: StatusRole,
}

#[derive(Debug, Serialize)]
struct Catalogs {
    statuses: Vec<StatusRow>,
    extension_options: Vec<ExtensionOption>,
}

pub fn run_lookups(args: &LookupsArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut session = Session::open(project_root)?;
    match &args.command {
        LookupsCommand::List => {
            let catalogs = Catalogs {
                statuses: load_statuses(&session.conn)?
                    .into_iter()
                    .map(|status| StatusRow {
                        role: StatusRole::from_internal_name(&status.name_internal),
                        status,
                    })
                    .collect(),
                extension_options: load_extension_options(&session.conn)?,
            };
            render(output, &catalogs, |catalogs, w| {
                pretty_section(w, "Statuses")?;
                for row in &catalogs.statuses {
                    writeln!(
                        w,
                        "{:>4}  {:<16} {:<14} {}",
                        row.status.id,
                        row.status.name_internal,
                        row.role.to_string(),
                        row.status.name_external
                    )?;
                }
                writeln!(w)?;
                pretty_section(w, "Extension dates")?;
                for option in &catalogs.extension_options {
                    writeln!(w, "{:>4}  {}", option.id, option.name)?;
                }
                Ok(())
            })
        }
        LookupsCommand::AddExtension { name } => {
            let option = add_extension_option(&session.conn, &mut session.cache, name)?;
            render(output, &option, |option, w| {
                writeln!(w, "Added extension date #{}: {}", option.id, option.name)
            })
        }
    }
}
