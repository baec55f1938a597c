//! `tq reorder`: apply a full drag order to the queue.

use super::{Globals, Session};
use crate::output::render;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use taxq_core::db::workqueue::reorder_items;
use taxq_core::reconcile::RankChange;

#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Every queued item id, front of the queue first.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ReorderReport {
    account_id: i64,
    changes: Vec<RankChange>,
}

pub fn run_reorder(args: &ReorderArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;

    let changes = reorder_items(
        &mut session.conn,
        &mut session.cache,
        &session.options,
        account.id,
        &args.ids,
    )?;

    if globals.quiet && !globals.output.is_json() {
        return Ok(());
    }
    let report = ReorderReport {
        account_id: account.id,
        changes,
    };
    render(globals.output, &report, |report, w| {
        if report.changes.is_empty() {
            return writeln!(w, "Queue order unchanged.");
        }
        writeln!(w, "Re-ranked {} item(s):", report.changes.len())?;
        for change in &report.changes {
            writeln!(
                w,
                "  #{:<6} position {}  client {}",
                change.id,
                change.position.map_or_else(|| "-".to_string(), |n| n.to_string()),
                change
                    .external_queue_position
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
            )?;
        }
        Ok(())
    })
}
