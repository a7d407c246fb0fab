//! KVK CLI - runs text commands typed at the terminal.
//!
//! This binary provides a `kvk` command that reads command lines from stdin
//! (or runs one given on the command line) and dispatches them through the
//! kvk command engine.

mod commands;
mod config;
mod runner;
mod source;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kvk_core::command::SimpleDispatcher;
use kvk_core::source::CommandSource;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{CliConfig, RequesterConfig};
use runner::Runner;
use source::ConsoleSource;

/// KVK CLI - text command runner
///
/// Lines starting with the command prefix are parsed and dispatched; all
/// other lines are ignored. Pass a command after the options to run it once
/// and exit.
#[derive(Parser, Debug)]
#[command(name = "kvk", author, version, about = "Run kvk text commands")]
struct Args {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Additional configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Prefix marking a line as a command
    #[arg(short, long)]
    prefix: Option<String>,

    /// Number of commands processed concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Name to run commands as
    #[arg(long = "as", value_name = "NAME")]
    as_name: Option<String>,

    /// Permission to hold (repeatable)
    #[arg(long = "permission", value_name = "ID")]
    permissions: Vec<String>,

    /// Command to run once instead of reading stdin
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Args {
    /// The options given on the command line, as a configuration layer.
    fn overrides(&self) -> CliConfig {
        CliConfig {
            prefix: self.prefix.clone(),
            workers: self.workers,
            log_level: self.log_level.clone(),
            requester: RequesterConfig { name: self.as_name.clone(), permissions: self.permissions.clone() },
        }
    }
}

fn init_tracing(log_level: Option<&str>) -> anyhow::Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CliConfig::discover_and_load(args.config.as_deref())?;
    config.merge(&args.overrides());
    config.validate()?;

    init_tracing(config.log_level.as_deref())?;

    let dispatcher = Arc::new(SimpleDispatcher::new());
    commands::register_all(&dispatcher)?;

    let source = Arc::new(ConsoleSource::new(config.requester_name(), config.requester.permissions.clone()));
    info!(
        commands = dispatcher.commands().len(),
        requester = source.name(),
        prefix = config.prefix(),
        workers = config.workers(),
        "command registry ready"
    );

    if !args.command.is_empty() {
        let line = args.command.join(" ");
        if !runner::execute_line(&dispatcher, source.as_ref(), &line).await {
            std::process::exit(1);
        }
        return Ok(());
    }

    let runner = Runner::new(dispatcher, source, config.prefix(), config.workers());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let failures = runner.run(stdin).await?;
    debug!(failures, "input closed");
    Ok(())
}
