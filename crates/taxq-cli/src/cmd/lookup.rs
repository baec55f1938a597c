//! `tq lookup`: what a client sees for their return.

use super::Session;
use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;
use taxq_core::client::client_status;

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Firm subdomain.
    #[arg(long)]
    pub subdomain: String,

    #[arg(short, long)]
    pub year: i32,

    #[arg(short, long)]
    pub identifier: String,
}

pub fn run_lookup(args: &LookupArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut session = Session::open(project_root)?;
    let status = client_status(
        &session.conn,
        &mut session.cache,
        &args.subdomain,
        args.year,
        &args.identifier,
    )?;
    render_mode(
        output,
        &status,
        |status, w| writeln!(w, "{}", status.message),
        |status, w| {
            writeln!(w, "{}", status.message)?;
            if let Some(n) = status.queue_position {
                writeln!(w, "  Returns ahead of yours: {}", n.saturating_sub(1))?;
            }
            Ok(())
        },
    )
}
