mod cli;
mod commands;
mod error;
mod render;

use std::process;

use clap::Parser;
use storyreel_client::config::ClientConfig;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::commands::CommandExecutor;
use crate::error::Result;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = args.engine_url {
        config.engine_url = url;
    }
    if let Some(url) = args.batch_url {
        config.batch_service_url = url;
    }

    let executor = CommandExecutor::new(config, args.json);

    match args.command {
        Commands::Generate(generate) => executor.generate(generate).await,
        Commands::Status { job_id, logs } => executor.status(&job_id, logs).await,
        Commands::Cancel { job_id } => executor.cancel_job(&job_id).await,
        Commands::Delete { job_id } => executor.delete_job(&job_id).await,
        Commands::Batch(command) => executor.batch(command).await,
    }
}

/// Logs go to stderr so stdout stays clean for rendered output and JSON.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "storyreel_cli=debug,storyreel_client=debug"
    } else {
        "storyreel_cli=warn,storyreel_client=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
