//! provision command - Make sure the log bucket exists
//!
//! Connecting creates the bucket when it is missing, so this command is a
//! connect plus a report of where logs will go.

use logstore_core::Context;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Debug, Serialize)]
struct ProvisionOutput {
    status: &'static str,
    endpoint: String,
    location: String,
    bucket: String,
}

/// Execute the provision command
pub async fn execute(url: Option<String>, ctx: &Context, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (store, store_url) = match super::connect(url, ctx, &formatter).await {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    if formatter.is_json() {
        formatter.json(&ProvisionOutput {
            status: "success",
            endpoint: store_url.endpoint_url(),
            location: store_url.location.clone(),
            bucket: store.bucket().to_string(),
        });
    } else {
        formatter.success(&format!(
            "Bucket '{}' is ready at {} ({})",
            store.bucket(),
            store_url.endpoint_url(),
            store_url.location
        ));
    }
    ExitCode::Success
}
