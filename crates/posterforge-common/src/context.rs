//! Scoped cancellation with deadlines.
//!
//! A [`RunContext`] pairs a [`CancellationToken`] with an optional deadline.
//! Children are derived from a parent token, so cancelling any level cancels
//! every descendant, and a child's deadline is clamped to its parent's so no
//! descendant can outlive the scope that created it.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ContextError, Error, Result};

#[derive(Debug, Clone)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    /// A root context with no deadline.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A root context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Wrap an existing token (e.g. one owned by a signal handler).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child sharing this context's deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child whose deadline is `min(parent deadline, now + timeout)`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < requested => parent,
            _ => requested,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and all of its descendants. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Why the context stopped, or `None` while it is still live.
    ///
    /// An explicit cancellation wins over an expired deadline.
    pub fn cause(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// Checkpoint: fail with [`Error::Cancelled`] if the context has stopped.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        match self.cause() {
            Some(cause) => Err(Error::cancelled(stage, cause)),
            None => Ok(()),
        }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn cancelled(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => {
                        self.cause().unwrap_or(ContextError::DeadlineExceeded)
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Run `fut` unless the context stops first, in which case the future is
    /// dropped and [`Error::Cancelled`] is returned for `stage`.
    pub async fn run<F, T>(&self, stage: &'static str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        self.check(stage)?;
        tokio::select! {
            biased;
            cause = self.cancelled() => Err(Error::cancelled(stage, cause)),
            res = fut => res,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
