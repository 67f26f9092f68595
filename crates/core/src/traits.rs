//! LogStore trait definition
//!
//! This trait is the contract a call-log backend offers to the layers above it.
//! It keeps those layers independent of the S3 SDK and can be mocked for testing.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::context::Context;
use crate::error::Result;

/// A lazily-read, single-pass stream of log bytes
pub type LogReader = Box<dyn AsyncRead + Send + Unpin>;

/// Storage for per-call logs
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Store `log` as the log of `call_id` in `app_name`, replacing any previous log
    ///
    /// The stream is consumed as it is uploaded; its length does not need to be known.
    async fn insert_log(
        &self,
        ctx: &Context,
        app_name: &str,
        call_id: &str,
        log: LogReader,
    ) -> Result<()>;

    /// Open the log of `call_id` in `app_name` for reading
    ///
    /// Returns [`crate::Error::NotFound`] if no log was stored under that pair.
    async fn get_log(&self, ctx: &Context, app_name: &str, call_id: &str) -> Result<LogReader>;
}
