//! Wait for a mapped port to accept TCP connections.

use std::time::Duration;

use async_trait::async_trait;
use capsule_common::{CapsuleError, CapsuleResult, ExposedPort};
use tokio::net::TcpStream;

use super::{DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_TIMEOUT, WaitStrategy, WaitTarget};

/// Ready once the host side of an exposed port accepts a connection.
#[derive(Debug, Clone)]
pub struct ForListeningPort {
    port: ExposedPort,
    startup_timeout: Duration,
    poll_interval: Duration,
}

/// Wait for `port` to accept connections.
pub fn for_listening_port(port: impl Into<ExposedPort>) -> ForListeningPort {
    ForListeningPort::new(port)
}

impl ForListeningPort {
    /// Wait for `port`.
    pub fn new(port: impl Into<ExposedPort>) -> Self {
        Self {
            port: port.into(),
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

    /// Pause `interval` between connection attempts.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn poll(&self, target: &dyn WaitTarget) -> CapsuleResult<()> {
        loop {
            match target.info().await {
                Ok(info) => match info.mapped_port(self.port) {
                    Ok(host_port) => {
                        match TcpStream::connect((info.host(), host_port)).await {
                            Ok(_) => return Ok(()),
                            Err(e) => tracing::trace!(
                                container_id = %target.id(),
                                host_port,
                                error = %e,
                                "Port not accepting connections yet"
                            ),
                        }
                    }
                    // Bindings can lag behind the start call.
                    Err(CapsuleError::PortNotMapped { .. }) => {}
                    Err(e) => return Err(e),
                },
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl WaitStrategy for ForListeningPort {
    async fn wait_until_ready(&self, target: &dyn WaitTarget) -> CapsuleResult<()> {
        match tokio::time::timeout(self.startup_timeout, self.poll(target)).await {
            Ok(result) => result,
            Err(_) => Err(CapsuleError::ReadinessTimeout {
                id: target.id().to_string(),
                timeout: self.startup_timeout,
                condition: format!("port {} listening", self.port),
            }),
        }
    }
}
