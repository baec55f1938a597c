//! `tq recompute`: repair (or with `--check`, only verify) queue ranks.

use super::{CodedError, Globals, Session};
use crate::output::render;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use taxq_core::ErrorCode;
use taxq_core::db::workqueue::{recompute_account, verify_account};

#[derive(Args, Debug)]
pub struct RecomputeArgs {
    /// Report drift without writing; fails when ranks are inconsistent.
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    account_id: i64,
    consistent: bool,
}

pub fn run_recompute(args: &RecomputeArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;

    if args.check {
        if let Err(violation) = verify_account(&session.conn, &mut session.cache, account.id)? {
            tracing::warn!(account_id = account.id, %violation, "queue ranks inconsistent");
            return Err(CodedError::new(ErrorCode::CorruptStore, violation.to_string()).into());
        }
        let report = CheckReport {
            account_id: account.id,
            consistent: true,
        };
        if globals.quiet && !globals.output.is_json() {
            return Ok(());
        }
        return render(globals.output, &report, |_, w| writeln!(w, "Queue ranks are consistent."));
    }

    let report = recompute_account(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
    )?;
    if globals.quiet && !globals.output.is_json() {
        return Ok(());
    }
    render(globals.output, &report, |report, w| {
        if report.changes.is_empty() {
            writeln!(w, "Checked {} item(s); nothing to repair.", report.examined)
        } else {
            writeln!(
                w,
                "Checked {} item(s); repaired ranks on {}.",
                report.examined,
                report.changes.len()
            )
        }
    })
}
