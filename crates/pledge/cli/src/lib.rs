//! pledge CLI - replay operation scripts against an in-memory pledge ledger
//!
//! - Show the effective deployment configuration
//! - Validate a configuration and open a ledger from it
//! - Run a JSON operation script and print the resulting ledger state

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod script;

pub use config::{AccountConfig, CliConfig};
pub use error::{CliError, CliResult};
pub use script::{parse_script, RunReport, ScriptRunner, Step, StepOutcome, StepResult};

/// pledge CLI application
#[derive(Parser, Debug)]
#[command(name = "pledge")]
#[command(about = "Pledge ledger - commitment scripts against an in-memory ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PLEDGE_CONFIG")]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show configuration
    Config,

    /// Validate configuration and open a ledger
    Check,

    /// Replay an operation script and print the final ledger state
    Run {
        /// JSON array of steps
        script: PathBuf,

        /// Stop at the first rejected step
        #[arg(long)]
        stop_on_error: bool,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
}

/// Run using the current process arguments.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let output = execute(cli)?;
    println!("{}", output);
    Ok(())
}

fn execute(cli: Cli) -> CliResult<String> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => config.to_toml(),
        Commands::Check => {
            config.ledger.validate()?;
            let runner = ScriptRunner::new(config.clone())?;
            let ledger_config = runner.ledger().config()?;
            let summary = json!({
                "status": "ok",
                "accounts": config.accounts.len(),
                "config": ledger_config,
                "start_time": runner.ledger().now(),
            });
            Ok(serde_json::to_string_pretty(&summary)?)
        }
        Commands::Run {
            script,
            stop_on_error,
            compact,
        } => {
            let contents = std::fs::read_to_string(&script)?;
            let steps = parse_script(&contents)?;
            let runner = ScriptRunner::new(config)?;
            let outcomes = runner.run(&steps, stop_on_error)?;
            let report = runner.report(outcomes)?;
            if compact {
                Ok(serde_json::to_string(&report)?)
            } else {
                Ok(serde_json::to_string_pretty(&report)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pledge-cli-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pledge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_run_arguments() {
        let parsed = cli(&["-c", "deploy.toml", "run", "steps.json", "--stop-on-error"]);
        assert_eq!(parsed.config.as_deref(), Some("deploy.toml"));
        assert!(matches!(
            parsed.command,
            Commands::Run { stop_on_error: true, compact: false, .. }
        ));
    }

    #[test]
    fn check_reports_initial_config() {
        let config = temp_file(
            "check.toml",
            "[ledger]\nbase_fee = 0\n\n[[accounts]]\nname = \"alice\"\nbalance = 5000000\n",
        );
        let output = execute(cli(&["-c", config.to_str().unwrap(), "check"])).unwrap();
        std::fs::remove_file(&config).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["accounts"], 1);
        assert_eq!(value["config"]["base_fee"], 0);
        assert_eq!(value["config"]["paused"], false);
    }

    #[test]
    fn check_rejects_invalid_settings() {
        let config = temp_file("bad.toml", "[ledger]\nmin_amount = 10\nmax_amount = 5\n");
        let err = execute(cli(&["-c", config.to_str().unwrap(), "check"])).unwrap_err();
        std::fs::remove_file(&config).unwrap();
        assert!(matches!(err, CliError::Ledger(_)));
    }

    #[test]
    fn run_prints_report() {
        let config = temp_file(
            "run.toml",
            "start_time = \"2025-06-15T12:00:00Z\"\n\n[[accounts]]\nname = \"alice\"\nbalance = 50000000\n",
        );
        let script = temp_file(
            "run.json",
            r#"[
                {"op": "register", "account": "alice", "age_secs": 3600},
                {"op": "create", "account": "alice", "amount": 20000000, "text": "ship it", "handle": "alice"},
                {"op": "advance", "secs": 90000},
                {"op": "revoke", "account": "alice"}
            ]"#,
        );
        let output = execute(cli(&[
            "-c",
            config.to_str().unwrap(),
            "run",
            script.to_str().unwrap(),
            "--compact",
        ]))
        .unwrap();
        std::fs::remove_file(&config).unwrap();
        std::fs::remove_file(&script).unwrap();

        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["steps"][3]["result"]["status"], "failed");
        assert_eq!(report["steps"][3]["result"]["category"], "timing");
        assert_eq!(report["solvency"]["pooled"], 20_000_000);
        assert_eq!(report["accounts"][0]["balance"], 29_000_000);
        assert_eq!(report["accounts"][0]["status"]["state"], "active");
        assert_eq!(report["now"], 1_749_988_800u64 + 90_000);
    }
}
