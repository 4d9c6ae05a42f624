use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

/// How long the runtime waits for blocking work (the stdin reader) on exit
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "lat", about = "Local activity tracker for the browser")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Run the relay agent as a native-messaging host on stdio
    Relay(commands::relay::RelayArgs),
    /// Push recorded page sessions through capture and relay
    Replay(commands::replay::ReplayArgs),
}

/// `RUST_LOG` when set, otherwise `info` (or `debug` with `--verbose`)
fn log_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries native-messaging frames, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match cli.command {
            Commands::Config(args) => commands::config::run(args),
            Commands::Relay(args) => commands::relay::run(args).await,
            Commands::Replay(args) => commands::replay::run(args).await,
        }
    });

    // A blocking stdin read cannot be cancelled, so do not wait on it forever
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
