//! Per-call cancellation and deadline context.
//!
//! Every runtime call and readiness wait made by the pipeline runs through
//! [`ExecutionContext::run`]. Cancelling the token or reaching the deadline
//! drops the in-flight future, which aborts the underlying request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CapsuleError, CapsuleResult};

/// Cancellation token plus optional deadline, threaded through a call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Use the given token for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Set a deadline relative to now.
    ///
    /// A timeout too large to represent leaves the current deadline as is.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// The cancellation token of this context.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The deadline of this context, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the context is already done.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancellation.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` until it completes or the context is done.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Cancelled`] or [`CapsuleError::DeadlineExceeded`]
    /// when the context ends first, otherwise whatever `fut` returns.
    pub async fn run<F, T>(&self, fut: F) -> CapsuleResult<T>
    where
        F: Future<Output = CapsuleResult<T>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(CapsuleError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => {
                tracing::debug!("Execution context cancelled");
                Err(CapsuleError::Cancelled)
            }
            () = deadline => {
                tracing::debug!("Execution context deadline exceeded");
                Err(CapsuleError::DeadlineExceeded)
            }
            result = fut => result,
        }
    }
}
