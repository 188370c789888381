//! Subcommand implementations.

use std::io::Write;

use anyhow::Context;
use clusterlint_core::{
    engine, CheckFilter, DiagnosticFilter, ObjectFetcher, ObjectFilter, Registry, Severity,
};

use crate::output::{self, OutputFormat};

/// Arguments of `clusterlint run`.
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Run only checks in these groups.
    #[arg(short = 'g', long = "groups", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Skip checks in these groups.
    #[arg(short = 'G', long = "ignore-groups", value_delimiter = ',')]
    pub ignore_groups: Vec<String>,

    /// Run only these checks.
    #[arg(short = 'c', long = "checks", value_delimiter = ',')]
    pub checks: Vec<String>,

    /// Skip these checks.
    #[arg(short = 'C', long = "ignore-checks", value_delimiter = ',')]
    pub ignore_checks: Vec<String>,

    /// Lint only these namespaces.
    #[arg(short = 'n', long = "namespace", value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Skip these namespaces.
    #[arg(short = 'N', long = "ignore-namespace", value_delimiter = ',')]
    pub ignore_namespaces: Vec<String>,

    /// Report only diagnostics of this severity.
    #[arg(long, value_parser = parse_severity)]
    pub level: Option<Severity>,

    /// Output format.
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::parse(s).ok_or_else(|| {
        let valid: Vec<_> = Severity::ALL.iter().map(Severity::as_str).collect();
        format!("invalid level '{s}', expected one of: {}", valid.join(", "))
    })
}

impl RunArgs {
    /// Build the check and namespace filters from the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if include and exclude flags are combined on the same
    /// axis.
    pub fn filters(&self) -> anyhow::Result<(CheckFilter, ObjectFilter, DiagnosticFilter)> {
        let checks = CheckFilter::new(
            self.groups.clone(),
            self.ignore_groups.clone(),
            self.checks.clone(),
            self.ignore_checks.clone(),
        )
        .context("invalid check selection")?;
        let objects = ObjectFilter::new(self.namespaces.clone(), self.ignore_namespaces.clone())
            .context("invalid namespace selection")?;
        let diagnostics = DiagnosticFilter {
            severity: self.level,
        };
        Ok((checks, objects, diagnostics))
    }
}

/// `clusterlint list`
pub fn list<W: Write>(out: &mut W, registry: &Registry, groups: &[String]) -> anyhow::Result<()> {
    let checks = if groups.is_empty() {
        registry.list()
    } else {
        registry.get_groups(groups)
    };
    output::write_checks(out, &checks)?;
    Ok(())
}

/// `clusterlint groups`
pub fn groups<W: Write>(out: &mut W, registry: &Registry) -> anyhow::Result<()> {
    output::write_groups(out, &registry.list_groups())?;
    Ok(())
}

/// `clusterlint run`
///
/// Returns whether any error-severity diagnostic was reported.
pub async fn run<W: Write>(
    out: &mut W,
    fetcher: &dyn ObjectFetcher,
    registry: &Registry,
    args: &RunArgs,
) -> anyhow::Result<bool> {
    let (check_filter, object_filter, diagnostic_filter) = args.filters()?;

    let mut result = engine::run(
        fetcher,
        registry,
        &check_filter,
        &diagnostic_filter,
        &object_filter,
    )
    .await
    .context("lint run failed")?;
    result.sort();

    output::write_result(out, &result, args.output)?;
    Ok(result.has_errors())
}
