//! `tq stats`: queue dashboard counters.

use super::{Globals, Session};
use crate::output::{pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use std::io::Write;
use taxq_core::db::stats::{QueueStats, queue_stats};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Limit counts to one return year.
    #[arg(short, long)]
    pub year: Option<i32>,
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn write_text(stats: &QueueStats, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "total\t{}", stats.total)?;
    writeln!(w, "active\t{}", stats.active)?;
    writeln!(w, "completed\t{}", stats.completed)?;
    writeln!(w, "staff_queue_length\t{}", stats.staff_queue_length)?;
    writeln!(w, "client_queue_length\t{}", stats.client_queue_length)?;
    for status in &stats.by_status {
        writeln!(w, "status:{}\t{}", status.name, status.count)?;
    }
    Ok(())
}

fn write_pretty(stats: &QueueStats, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = stats
        .return_year
        .map_or_else(|| "Queue stats".to_string(), |year| format!("Queue stats ({year})"));
    pretty_section(w, &heading)?;
    pretty_kv(w, "Total", stats.total.to_string())?;
    pretty_kv(w, "Active", stats.active.to_string())?;
    pretty_kv(w, "Completed", stats.completed.to_string())?;
    pretty_kv(w, "Staff queue", stats.staff_queue_length.to_string())?;
    pretty_kv(w, "Client queue", stats.client_queue_length.to_string())?;
    pretty_kv(w, "Avg days", opt(stats.avg_processing_days.map(|d| format!("{d:.1}"))))?;
    pretty_kv(w, "Oldest (days)", opt(stats.oldest_active_days))?;
    pretty_kv(
        w,
        "Waiting share",
        opt(stats.received_share.map(|s| format!("{:.0}%", s * 100.0))),
    )?;
    writeln!(w)?;
    pretty_section(w, "By status")?;
    for status in &stats.by_status {
        pretty_kv(w, &status.name, status.count.to_string())?;
    }
    Ok(())
}

pub fn run_stats(args: &StatsArgs, globals: &Globals) -> Result<()> {
    let mut session = Session::open(&globals.project_root)?;
    let account = session.account(globals.account.as_deref())?;
    let stats = queue_stats(&session.conn, &mut session.cache, account.id, args.year)?;
    render_mode(globals.output, &stats, write_text, write_pretty)
}
