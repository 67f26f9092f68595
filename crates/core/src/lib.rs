//! logstore-core: Core library for the logstore call-log backend
//!
//! This crate provides the SDK-independent pieces of logstore:
//! - Store URL parsing
//! - Log key construction and identifier validation
//! - Cancellation contexts
//! - The LogStore trait
//! - CLI configuration file management
//!
//! Nothing here depends on the S3 SDK, so the trait can be mocked in tests.

pub mod config;
pub mod context;
pub mod error;
pub mod key;
pub mod store_url;
pub mod traits;

pub use config::{Config, ConfigManager};
pub use context::Context;
pub use error::{Error, Result};
pub use key::{LOG_CONTENT_TYPE, LogKey};
pub use store_url::StoreUrl;
pub use traits::{LogReader, LogStore};
