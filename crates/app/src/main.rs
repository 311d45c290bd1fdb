use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod table;

use args::{Args, Command};

/// Crates whose logs the `--log-level` flag controls.
const LOG_TARGETS: [&str; 4] = [
    "splitbook",
    "splitbook_core",
    "splitbook_import",
    "splitbook_storage",
];

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn main_inner(args: Args) -> anyhow::Result<()> {
    trace!("{args:?}");
    match args.command() {
        Command::Categorize(categorize_args) => {
            commands::categorize(args.common(), categorize_args).await
        }
        Command::Parse(parse_args) => commands::parse(parse_args),
        Command::Lists(lists_args) => commands::lists(args.common(), lists_args.command()).await,
    }
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        // RUST_LOG exists; use it.
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(
            LOG_TARGETS
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(","),
        ),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
