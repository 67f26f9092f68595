//! Cancellation and deadlines for store operations
//!
//! Every store operation takes a [`Context`]. Canceling the context, or letting
//! its deadline pass, aborts the in-flight request and makes the operation
//! return [`Error::Canceled`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

const CANCELED: &str = "context canceled";
const DEADLINE_EXCEEDED: &str = "context deadline exceeded";

/// Cancellation signal plus an optional deadline
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never canceled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that is canceled along with this one
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context that expires at `deadline`
    ///
    /// The earlier of the two deadlines wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error this context is done with, if it is done
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Canceled(CANCELED.to_string()));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(Error::Canceled(DEADLINE_EXCEEDED.to_string()))
            }
            _ => None,
        }
    }

    /// Resolves once the context is canceled or its deadline passes
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Error::Canceled(CANCELED.to_string()),
                    _ = tokio::time::sleep_until(deadline) => {
                        Error::Canceled(DEADLINE_EXCEEDED.to_string())
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                Error::Canceled(CANCELED.to_string())
            }
        }
    }

    /// Drive `fut` to completion unless the context finishes first
    ///
    /// An already-done context returns its error without polling `fut`.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            res = fut => res,
        }
    }
}
