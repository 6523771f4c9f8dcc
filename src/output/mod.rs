//! Output formatting module
//!
//! Handles:
//! - Human-readable load reports (phase, variant, hacks, bound hooks)
//! - Human-readable op listings and addable switch groups
//! - JSON output of the same structures

use anyhow::Result;
use serde::Serialize;
use std::fmt::{self, Write};

use opshim::models::{HackStatus, LoadOutput, PhaseReport, Subject};
use opshim::ops::{AddableSwitches, OpLabels, OpReport, OpsModel};
use opshim::variant::VariantOutcome;

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_duration(duration_ms: u64) -> String {
    let duration_sec = duration_ms as f64 / 1000.0;
    if duration_sec < 1.0 {
        format!("{}ms", duration_ms)
    } else {
        format!("{:.2}s", duration_sec)
    }
}

fn write_phase(out: &mut String, report: &PhaseReport) -> fmt::Result {
    writeln!(out, "{} phase ({}):", report.phase, report.package)?;

    match &report.variant {
        Some(VariantOutcome::Resolved { name, attempts, .. }) => {
            writeln!(out, "  Variant: {} (after {} attempt(s))", name, attempts)?
        }
        Some(VariantOutcome::Exhausted { attempts, .. }) => {
            writeln!(out, "  Variant: none matched ({} attempt(s) failed)", attempts)?
        }
        None => writeln!(out, "  Variant: not a settings host")?,
    }
    if let Some(outcome) = &report.variant {
        for failure in outcome.failures() {
            writeln!(out, "    {}: [!!] {}", failure.name, failure.cause)?;
        }
    }

    if !report.hacks.is_empty() {
        writeln!(out, "  Hacks:")?;
        for hack in &report.hacks {
            match &hack.status {
                HackStatus::Applied => writeln!(out, "    {}: applied", hack.name)?,
                HackStatus::NotApplicable => writeln!(out, "    {}: n/a", hack.name)?,
                HackStatus::Failed { error } => writeln!(out, "    {}: FAILED ({})", hack.name, error)?,
            }
        }
    }

    if !report.bound_hooks.is_empty() {
        writeln!(out, "  Hooks:")?;
        for hook in &report.bound_hooks {
            if hook.declaring_class == hook.requested_class {
                writeln!(out, "    {}#{}", hook.requested_class, hook.method)?;
            } else {
                writeln!(
                    out,
                    "    {}#{} (declared on {}, {} retries)",
                    hook.requested_class, hook.method, hook.declaring_class, hook.retries
                )?;
            }
        }
    }

    if !report.resources_added.is_empty() {
        writeln!(out, "  Resources: {}", report.resources_added.join(", "))?;
    }
    writeln!(out, "  Duration: {}", format_duration(report.duration_ms))
}

pub fn render_load(output: &LoadOutput) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for report in &output.reports {
        write_phase(&mut out, report)?;
        writeln!(out)?;
    }
    let failed: usize = output.reports.iter().map(|r| r.failed_hacks().count()).sum();
    writeln!(out, "Load Summary:")?;
    writeln!(out, "  Phases: {}", output.reports.len())?;
    writeln!(out, "  Failed hacks: {}", failed)?;
    Ok(out)
}

pub fn render_ops(subject: &Subject, reports: &[OpReport], labels: &dyn OpLabels) -> Result<String, fmt::Error> {
    let mut out = String::new();
    if reports.is_empty() {
        writeln!(out, "No ops tracked for {}.", subject)?;
        return Ok(out);
    }

    writeln!(out, "Ops for {}:\n", subject)?;
    for report in reports {
        let label = labels.label(report.op).unwrap_or_else(|| report.name.clone());
        write!(out, "  {} [{}]: {}", label, report.op, report.mode)?;
        if report.switch_group != report.op {
            write!(out, " (switch {}: {})", report.switch_name, report.switch_mode)?;
        }
        if let Some(time) = report.last_access {
            write!(out, ", last access {}", time.format("%Y-%m-%d %H:%M:%S"))?;
        }
        writeln!(out)?;
        if let Some(summary) = labels.summary(report.op) {
            writeln!(out, "      {}", summary)?;
        }
    }
    Ok(out)
}

pub fn render_addable(
    subject: &Subject,
    addable: &AddableSwitches,
    ops: &OpsModel,
    labels: &dyn OpLabels,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    if addable.is_empty() {
        writeln!(out, "Nothing to add for {}.", subject)?;
        return Ok(out);
    }

    let op_name = |op: u32| ops.op_name(op).map(str::to_string).unwrap_or_else(|| format!("#{}", op));
    writeln!(out, "Addable switches for {}:\n", subject)?;
    for (switch, members) in addable {
        let name = labels.label(*switch).unwrap_or_else(|| op_name(*switch));
        let members: Vec<String> = members.iter().map(|op| op_name(*op)).collect();
        writeln!(out, "  {} [{}]: {}", name, switch, members.join(", "))?;
    }
    Ok(out)
}
