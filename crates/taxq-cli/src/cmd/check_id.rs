//! `tq check-id`: is an identifier free for a return year?

use super::{Globals, Session};
use crate::output::render;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use taxq_core::db::query::is_identifier_available;
use taxq_core::validate::normalize_identifier;

#[derive(Args, Debug)]
pub struct CheckIdArgs {
    pub identifier: String,

    #[arg(short, long)]
    pub year: Option<i32>,

    /// Ignore this item (the one being edited).
    #[arg(long, value_name = "ID")]
    pub exclude: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Availability {
    identifier: String,
    return_year: i32,
    available: bool,
}

/// Exit status is success either way; scripts read `available`.
pub fn run_check_id(args: &CheckIdArgs, globals: &Globals) -> Result<()> {
    let session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let return_year = session.return_year(args.year)?;
    let identifier = normalize_identifier(&args.identifier, session.options.identifier_max_len)?;

    let available =
        is_identifier_available(&session.conn, account.id, return_year, &identifier, args.exclude)?;

    let report = Availability {
        identifier,
        return_year,
        available,
    };
    render(globals.output, &report, |report, w| {
        if report.available {
            writeln!(w, "{} is available for {}.", report.identifier, report.return_year)
        } else {
            writeln!(w, "{} is already in use for {}.", report.identifier, report.return_year)
        }
    })
}
