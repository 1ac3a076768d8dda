//! Readiness strategies.
//!
//! A [`WaitStrategy`] blocks until a started container satisfies some
//! condition or its own startup timeout elapses. Strategies see the container
//! only through [`WaitTarget`].

mod log;
mod port;

use std::fmt;

use async_trait::async_trait;
use capsule_common::{CapsuleError, CapsuleResult, ContainerId, ExposedPort};

use crate::container::{ContainerInfo, StartedContainer};
use crate::runtime::RuntimeClient;

pub use log::{ForLog, for_log};
pub use port::{ForListeningPort, for_listening_port};

/// Default time a strategy waits before giving up.
pub const DEFAULT_STARTUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
/// Default pause between readiness probes.
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// Connectable surface of a started container.
#[async_trait]
pub trait WaitTarget: Send + Sync {
    /// Container ID.
    fn id(&self) -> &ContainerId;

    /// Current host and port mapping.
    async fn info(&self) -> CapsuleResult<ContainerInfo>;

    /// Host through which mapped ports are reachable.
    async fn host(&self) -> CapsuleResult<String> {
        Ok(self.info().await?.host().to_string())
    }

    /// Host port bound to `port`.
    async fn mapped_port(&self, port: ExposedPort) -> CapsuleResult<u16> {
        self.info().await?.mapped_port(port)
    }

    /// Snapshot of the container's output so far.
    async fn logs(&self) -> CapsuleResult<String>;
}

/// Condition a started container must satisfy before it is usable.
#[async_trait]
pub trait WaitStrategy: Send + Sync + fmt::Debug {
    /// Block until `target` is ready.
    ///
    /// Returns [`CapsuleError::ReadinessTimeout`] when the condition does not
    /// hold within the strategy's startup timeout.
    async fn wait_until_ready(&self, target: &dyn WaitTarget) -> CapsuleResult<()>;
}

/// [`WaitTarget`] backed by the runtime client.
#[derive(Debug)]
pub struct ContainerTarget<'a> {
    runtime: &'a dyn RuntimeClient,
    container: &'a StartedContainer,
}

impl<'a> ContainerTarget<'a> {
    /// Expose `container` on `runtime` to a strategy.
    pub fn new(runtime: &'a dyn RuntimeClient, container: &'a StartedContainer) -> Self {
        Self { runtime, container }
    }
}

#[async_trait]
impl WaitTarget for ContainerTarget<'_> {
    fn id(&self) -> &ContainerId {
        self.container.id()
    }

    async fn info(&self) -> CapsuleResult<ContainerInfo> {
        let id = self.container.id();
        let inspection = self
            .runtime
            .inspect_container(id.as_str())
            .await
            .map_err(|source| CapsuleError::Inspect {
                id: id.to_string(),
                source,
            })?;
        Ok(ContainerInfo::from_inspection(id.clone(), inspection))
    }

    async fn logs(&self) -> CapsuleResult<String> {
        let id = self.container.id();
        self.runtime
            .logs(id.as_str())
            .await
            .map_err(|source| CapsuleError::Logs {
                id: id.to_string(),
                source,
            })
    }
}
