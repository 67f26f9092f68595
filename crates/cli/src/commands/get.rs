//! get command - Display a call log
//!
//! Copies the log to stdout as it is downloaded.

use clap::Args;
use logstore_core::{Context, Error, LogStore, Result};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display a call log
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Application name
    pub app_name: String,

    /// Call ID
    pub call_id: String,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    key: String,
    size_bytes: u64,
}

/// Execute the get command
pub async fn execute(
    args: GetArgs,
    url: Option<String>,
    ctx: &Context,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (store, _) = match super::connect(url, ctx, &formatter).await {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    let key = format!("/{}/{}", args.app_name, args.call_id);
    let mut stdout = tokio::io::stdout();
    match run(&store, ctx, &args.app_name, &args.call_id, &mut stdout).await {
        Ok(size) => {
            // stdout carries the log itself, so the summary goes to stderr
            if formatter.is_json() {
                formatter.json_stderr(&GetOutput {
                    status: "success",
                    key,
                    size_bytes: size,
                });
            }
            ExitCode::Success
        }
        Err(e) if e.is_not_found() => {
            formatter.error(&format!("Log not found: {key}"));
            ExitCode::NotFound
        }
        Err(e) => {
            formatter.error(&format!("Failed to read log: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

/// Copy the log into `out`, returning the number of bytes written
async fn run<W>(
    store: &dyn LogStore,
    ctx: &Context,
    app_name: &str,
    call_id: &str,
    out: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut reader = store.get_log(ctx, app_name, call_id).await?;
    let size = ctx
        .run(async {
            let size = tokio::io::copy(&mut reader, out).await?;
            out.flush().await?;
            Ok::<_, Error>(size)
        })
        .await?;
    tracing::debug!(app_name, call_id, size, "read log");
    Ok(size)
}
