//! CLI command definitions and execution
//!
//! Store commands share one [`Context`]: Ctrl+C cancels it and `--timeout`
//! gives it a deadline, so an interrupted transfer is aborted rather than
//! left half-written.

use std::time::Duration;

use clap::{Parser, Subcommand};
use logstore_core::{ConfigManager, Context, Error, StoreUrl};
use logstore_s3::S3LogStore;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod config;
mod get;
mod provision;
mod put;

/// logstore - per-call log storage on S3-compatible object stores
///
/// Stores the log of one function call under /<app>/<call> in a bucket
/// and reads it back.
#[derive(Parser, Debug)]
#[command(name = "logstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Store URL: s3://access_key:secret_key@host/location/bucket?ssl=true
    #[arg(long, global = true, env = "LOGSTORE_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// Abort the operation after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a call log read from a file or stdin
    Put(put::PutArgs),

    /// Write a call log to stdout
    Get(get::GetArgs),

    /// Create the log bucket if it does not exist yet
    Provision,

    /// Manage the saved store URL
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let ctx = match cli.timeout {
        Some(secs) => Context::background().with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted, canceling");
            interrupt.cancel();
        }
    });

    let url = cli.url;
    match cli.command {
        Commands::Put(args) => put::execute(args, url, &ctx, output_config).await,
        Commands::Get(args) => get::execute(args, url, &ctx, output_config).await,
        Commands::Provision => provision::execute(url, &ctx, output_config).await,
        Commands::Config(cmd) => config::execute(cmd, output_config).await,
    }
}

/// Pick the store URL: flag or environment first, then the saved config
fn resolve_store_url(url: Option<String>, manager: &ConfigManager) -> Result<StoreUrl, Error> {
    if let Some(url) = url {
        return StoreUrl::parse(&url);
    }
    manager.load()?.store_url()?.ok_or_else(|| {
        Error::Config(
            "no store URL: pass --url, set LOGSTORE_URL, or run `logstore config set <url>`"
                .into(),
        )
    })
}

/// Resolve the store URL and connect, reporting failures through `formatter`
async fn connect(
    url: Option<String>,
    ctx: &Context,
    formatter: &Formatter,
) -> Result<(S3LogStore, StoreUrl), ExitCode> {
    let resolved = ConfigManager::new().and_then(|manager| resolve_store_url(url, &manager));
    let store_url = match resolved {
        Ok(u) => u,
        Err(e) => {
            formatter.error(&e.to_string());
            return Err(ExitCode::from_error(&e));
        }
    };

    tracing::debug!(url = %store_url, "connecting to log store");
    match ctx.run(S3LogStore::connect_url(&store_url)).await {
        Ok(store) => Ok((store, store_url)),
        Err(e) => {
            formatter.error(&format!("Failed to connect to log store: {e}"));
            Err(ExitCode::from_error(&e))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use logstore_core::{Context, LogReader, LogStore, Result};

    mockall::mock! {
        pub Store {}

        #[async_trait]
        impl LogStore for Store {
            async fn insert_log(
                &self,
                ctx: &Context,
                app_name: &str,
                call_id: &str,
                log: LogReader,
            ) -> Result<()>;

            async fn get_log(
                &self,
                ctx: &Context,
                app_name: &str,
                call_id: &str,
            ) -> Result<LogReader>;
        }
    }
}
