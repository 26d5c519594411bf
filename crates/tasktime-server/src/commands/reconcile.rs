//! Repairs task totals that drifted from their timelogs.
//!
//! A task's stored total grows on every stop, and a direct edit can
//! overwrite it. This command recomputes each total from the stopped
//! timelogs and reports or rewrites the ones that differ.

use std::io::Write;

use anyhow::{Context, Result};
use tasktime_core::UserId;
use tasktime_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let user = user.map(UserId::new).transpose().context("invalid user id")?;
    let report = db
        .reconcile_task_times(user.as_ref(), !dry_run)
        .context("failed to reconcile task totals")?;

    writeln!(writer, "Checked {} task(s).", report.tasks_checked)?;
    if report.drifted.is_empty() {
        writeln!(writer, "All task totals match their timelogs.")?;
        return Ok(());
    }

    for drift in &report.drifted {
        writeln!(
            writer,
            "- {} ({}): stored {}s, timelogs {}s",
            drift.title, drift.task, drift.stored, drift.computed
        )?;
    }
    if report.applied {
        writeln!(writer, "Updated {} task total(s).", report.drifted.len())?;
    } else {
        writeln!(writer, "Dry run; no totals changed.")?;
    }
    Ok(())
}
