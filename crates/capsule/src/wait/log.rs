//! Wait for a message in the container output.

use std::time::Duration;

use async_trait::async_trait;
use capsule_common::{CapsuleError, CapsuleResult};

use super::{DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_TIMEOUT, WaitStrategy, WaitTarget};

/// Ready once `message` appears in the logs the configured number of times.
#[derive(Debug, Clone)]
pub struct ForLog {
    message: String,
    occurrences: usize,
    startup_timeout: Duration,
    poll_interval: Duration,
}

/// Wait for `message` to appear in the container output.
pub fn for_log(message: impl Into<String>) -> ForLog {
    ForLog::new(message)
}

impl ForLog {
    /// Wait for one occurrence of `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurrences: 1,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Give up after `timeout`.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Pause `interval` between log reads.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Require `count` occurrences, e.g. for servers that log readiness twice.
    #[must_use]
    pub fn with_occurrences(mut self, count: usize) -> Self {
        self.occurrences = count.max(1);
        self
    }

    async fn poll(&self, target: &dyn WaitTarget) -> CapsuleResult<()> {
        loop {
            let logs = target.logs().await?;
            let seen = logs.matches(self.message.as_str()).count();
            if seen >= self.occurrences {
                return Ok(());
            }

            tracing::trace!(
                container_id = %target.id(),
                seen,
                wanted = self.occurrences,
                "Log message not seen yet"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl WaitStrategy for ForLog {
    async fn wait_until_ready(&self, target: &dyn WaitTarget) -> CapsuleResult<()> {
        match tokio::time::timeout(self.startup_timeout, self.poll(target)).await {
            Ok(result) => result,
            Err(_) => Err(CapsuleError::ReadinessTimeout {
                id: target.id().to_string(),
                timeout: self.startup_timeout,
                condition: format!("log message {:?} x{}", self.message, self.occurrences),
            }),
        }
    }
}
