//! logstore - per-call log storage CLI
//!
//! Stores and retrieves function call logs in an S3-compatible bucket.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use logstore_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `get` output on stdout stays clean
    let default_filter = if cli.debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
