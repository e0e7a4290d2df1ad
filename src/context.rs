//! # Operation Context
//!
//! One deadline and one cancellation token shared by every network round-trip
//! of a single run. Whichever round-trip is in flight when the deadline
//! passes or the token is cancelled is dropped, which aborts the underlying
//! request.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct OperationContext {
    timeout: Duration,
    deadline: Instant,
    cancel: CancellationToken,
}

impl OperationContext {
    /// Starts the clock: the deadline is `timeout` from now. A timeout too
    /// large to be represented as a point in time is a configuration error.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let deadline = Instant::now().checked_add(timeout).ok_or_else(|| {
            Error::configuration(format!("timeout of {}s is too large", timeout.as_secs()))
        })?;
        Ok(Self {
            timeout,
            deadline,
            cancel: CancellationToken::new(),
        })
    }

    /// A handle that cancels this context (and its clones) when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Drives `fut` to completion unless the context is cancelled or its
    /// deadline elapses first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(Error::DeadlineExceeded(self.timeout)),
            result = fut => result,
        }
    }
}
