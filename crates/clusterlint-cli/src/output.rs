//! Rendering of check listings and lint results.

use std::io::{self, Write};
use std::sync::Arc;

use clusterlint_core::{Check, CheckResult, Severity};

/// Output format of `clusterlint run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per diagnostic plus a summary.
    #[default]
    Text,
    /// The full result as pretty-printed JSON.
    Json,
}

/// Write `name<TAB>groups<TAB>description` for each check, sorted by name.
pub fn write_checks<W: Write>(out: &mut W, checks: &[Arc<dyn Check>]) -> io::Result<()> {
    let mut sorted: Vec<_> = checks.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));
    for check in sorted {
        writeln!(
            out,
            "{}\t{}\t{}",
            check.name(),
            check.groups().join(","),
            check.description()
        )?;
    }
    Ok(())
}

/// Write group names, one per line, sorted.
pub fn write_groups<W: Write>(out: &mut W, groups: &[String]) -> io::Result<()> {
    let mut sorted = groups.to_vec();
    sorted.sort();
    for group in sorted {
        writeln!(out, "{group}")?;
    }
    Ok(())
}

/// Write a lint result in the requested format.
pub fn write_result<W: Write>(
    out: &mut W,
    result: &CheckResult,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, result),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)
        }
    }
}

fn write_text<W: Write>(out: &mut W, result: &CheckResult) -> io::Result<()> {
    for diagnostic in &result.diagnostics {
        writeln!(out, "{diagnostic}")?;
    }

    let counts = result.count_by_severity();
    let summary: Vec<String> = Severity::ALL
        .iter()
        .map(|s| format!("{} {}", counts.get(s).copied().unwrap_or(0), plural(*s)))
        .collect();
    writeln!(out, "{}", summary.join(", "))
}

fn plural(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "errors",
        Severity::Warning => "warnings",
        Severity::Suggestion => "suggestions",
    }
}
