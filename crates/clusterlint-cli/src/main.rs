//! clusterlint - lint a live Kubernetes cluster.
//!
//! This is the entry point for the `clusterlint` binary.

mod commands;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clusterlint_core::Registry;
use clusterlint_kube::{KubeConfig, KubeFetcher};
use tracing_subscriber::EnvFilter;

use commands::RunArgs;

/// clusterlint - best-practice checks for Kubernetes clusters.
#[derive(Parser, Debug)]
#[command(name = "clusterlint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the kubeconfig file.
    #[arg(long, global = true, env = "CLUSTERLINT_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long, global = true, env = "CLUSTERLINT_CONTEXT")]
    context: Option<String>,

    /// Timeout in seconds for fetching cluster objects.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(long, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available checks.
    List {
        /// Show only checks in these groups.
        #[arg(short = 'g', long = "group")]
        groups: Vec<String>,
    },
    /// List check groups.
    Groups,
    /// Run checks against the cluster.
    Run(RunArgs),
}

impl Args {
    /// Environment settings overridden by explicit flags.
    fn kube_config(&self) -> KubeConfig {
        let mut config = KubeConfig::from_env();
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG wins over --debug
    let default_filter = if args.debug {
        "clusterlint=debug,warn"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let registry = Registry::global();
    clusterlint_checks::register_all(registry)?;

    let mut stdout = io::stdout().lock();
    match &args.command {
        Command::List { groups } => commands::list(&mut stdout, registry, groups)?,
        Command::Groups => commands::groups(&mut stdout, registry)?,
        Command::Run(run) => {
            let fetcher = KubeFetcher::connect(&args.kube_config()).await?;
            let has_errors = commands::run(&mut stdout, &fetcher, registry, run).await?;
            if has_errors {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let args = Args::parse_from([
            "clusterlint",
            "--context",
            "staging",
            "run",
            "-g",
            "basic,security",
            "-N",
            "kube-system",
            "--level",
            "error",
            "-o",
            "json",
        ]);
        assert_eq!(args.context.as_deref(), Some("staging"));
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.groups, vec!["basic", "security"]);
        assert_eq!(run.ignore_namespaces, vec!["kube-system"]);
        assert_eq!(run.level, Some(clusterlint_core::Severity::Error));
        assert_eq!(run.output, output::OutputFormat::Json);
    }

    #[test]
    fn flags_override_environment() {
        let args = Args::parse_from(["clusterlint", "--timeout", "45", "groups"]);
        let config = args.kube_config();
        assert_eq!(config.timeout, Some(Duration::from_secs(45)));
    }
}
