//! Rendering of the bootstrap report and the registry dump on stdout.

use std::io::Write;

use colored::Colorize;
use hearth_bootstrap::KickReport;
use hearth_core::ServiceCore;
use hearth_types::HearthError;

use crate::config::ReportFormat;

/// Write `report` to `out` in the requested format.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &KickReport,
    format: ReportFormat,
) -> Result<(), HearthError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| HearthError::Serialization(format!("failed to encode report: {e}")))?;
            writeln!(out, "{json}")?;
        }
        ReportFormat::Text => write_text(out, report)?,
    }
    Ok(())
}

fn write_text<W: Write>(out: &mut W, report: &KickReport) -> std::io::Result<()> {
    let status = if report.is_complete() {
        "complete".green().bold()
    } else {
        "degraded".yellow().bold()
    };
    writeln!(out, "Bootstrap {status} after {} sweep(s)", report.sweeps)?;

    for name in &report.fully_initialized {
        writeln!(out, "  {} {}", "✓".green(), name)?;
    }
    for name in &report.failed {
        let note = if report.partial.contains(name) {
            " (partially initialized)"
        } else {
            ""
        };
        writeln!(out, "  {} {}{}", "✗".red(), name, note.dimmed())?;
    }
    Ok(())
}

/// Write the registry contents under a heading.
pub fn write_dump<W: Write>(out: &mut W, core: &ServiceCore) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{} ({})", "Registered services".bold(), core.len())?;
    core.dump(out)
}
