//! put command - Store a call log
//!
//! Streams a file or stdin into the store without reading it into memory first.

use std::path::{Path, PathBuf};

use clap::Args;
use logstore_core::{Context, LogReader, LogStore, Result};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Store a call log
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Application name
    pub app_name: String,

    /// Call ID
    pub call_id: String,

    /// Read the log from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    bucket: String,
    key: String,
}

/// Execute the put command
pub async fn execute(
    args: PutArgs,
    url: Option<String>,
    ctx: &Context,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let log = match open_input(args.file.as_deref()).await {
        Ok(reader) => reader,
        Err(e) => {
            formatter.error(&format!("Failed to open log input: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let (store, _) = match super::connect(url, ctx, &formatter).await {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    match run(&store, ctx, &args.app_name, &args.call_id, log).await {
        Ok(()) => {
            let key = format!("/{}/{}", args.app_name, args.call_id);
            if formatter.is_json() {
                formatter.json(&PutOutput {
                    status: "success",
                    bucket: store.bucket().to_string(),
                    key,
                });
            } else {
                formatter.success(&format!("Stored log {key} in bucket '{}'", store.bucket()));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to store log: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

/// Open the log source: a file when given, stdin otherwise
async fn open_input(file: Option<&Path>) -> Result<LogReader> {
    match file {
        Some(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

async fn run(
    store: &dyn LogStore,
    ctx: &Context,
    app_name: &str,
    call_id: &str,
    log: LogReader,
) -> Result<()> {
    tracing::debug!(app_name, call_id, "storing log");
    store.insert_log(ctx, app_name, call_id, log).await
}
