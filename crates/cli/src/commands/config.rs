//! Config management commands
//!
//! Saves the store URL so later commands can run without `--url`.
//! The secret key is never printed back.

use clap::Subcommand;
use logstore_core::{ConfigManager, Result, StoreUrl};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate and save the store URL
    Set(SetArgs),

    /// Show the saved store URL with the secret key masked
    Show,

    /// Forget the saved store URL
    Clear,
}

/// Arguments for the `config set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Store URL: s3://access_key:secret_key@host/location/bucket?ssl=true
    pub url: String,
}

/// Store URL details for JSON output (without the secret key)
#[derive(Debug, Serialize)]
struct StoreUrlInfo {
    url: String,
    endpoint: String,
    location: String,
    bucket: String,
    ssl: bool,
}

impl From<&StoreUrl> for StoreUrlInfo {
    fn from(url: &StoreUrl) -> Self {
        Self {
            url: url.redacted(),
            endpoint: url.endpoint_url(),
            location: url.location.clone(),
            bucket: url.bucket.clone(),
            ssl: url.use_ssl,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigShowOutput {
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StoreUrlInfo>,
}

/// Execute a config subcommand
pub async fn execute(cmd: ConfigCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::GeneralError;
        }
    };

    let result = match cmd {
        ConfigCommands::Set(args) => execute_set(&args, &manager, &formatter),
        ConfigCommands::Show => execute_show(&manager, &formatter),
        ConfigCommands::Clear => execute_clear(&manager, &formatter),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

fn execute_set(args: &SetArgs, manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    let url = manager.set_store_url(&args.url)?;
    if formatter.is_json() {
        formatter.json(&StoreUrlInfo::from(&url));
    } else {
        formatter.success(&format!("Store URL saved: {url}"));
    }
    Ok(())
}

fn execute_show(manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    let store = manager.load()?.store_url()?;
    if formatter.is_json() {
        formatter.json(&ConfigShowOutput {
            config_path: manager.config_path().display().to_string(),
            store: store.as_ref().map(StoreUrlInfo::from),
        });
    } else {
        match store {
            Some(url) => formatter.println(&url.redacted()),
            None => formatter.println("No store URL configured."),
        }
    }
    Ok(())
}

fn execute_clear(manager: &ConfigManager, formatter: &Formatter) -> Result<()> {
    manager.clear_store_url()?;
    formatter.success("Store URL cleared.");
    Ok(())
}
