//! Container runtime capability.
//!
//! The pipeline talks to a container engine only through [`RuntimeClient`].
//! [`DockerClient`] implements it against the Docker Engine API; tests and
//! other engines provide their own implementations.

mod docker;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use capsule_common::{ExposedPort, RuntimeError};
use capsule_image::Platform;

pub use docker::DockerClient;

/// Everything the runtime needs to create a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateRequest {
    /// Resolved image reference.
    pub image: String,
    /// Platform to select when pulling the image.
    pub platform: Option<Platform>,
    /// Ports to publish on ephemeral host ports, in declaration order.
    pub exposed_ports: Vec<ExposedPort>,
    /// Environment variables (`KEY=value`).
    pub env: Vec<String>,
    /// Command override.
    pub cmd: Option<Vec<String>>,
    /// Container labels.
    pub labels: BTreeMap<String, String>,
    /// Container name; the runtime picks one when absent.
    pub name: Option<String>,
}

/// A host binding of a container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: ExposedPort,
    /// Host address the port is bound to, if reported.
    pub host_ip: Option<String>,
    /// Host port.
    pub host_port: u16,
}

/// Result of inspecting a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerInspection {
    /// Host name or address through which published ports are reachable.
    pub host: String,
    /// Whether the container process is running.
    pub running: bool,
    /// Host bindings of published ports.
    pub ports: Vec<PortBinding>,
}

/// Narrow interface to a container engine.
///
/// Implementations must be safe for concurrent use by independent calls.
#[async_trait]
pub trait RuntimeClient: Send + Sync + fmt::Debug {
    /// Create a container and return its runtime-assigned ID.
    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stop a container and remove it together with its anonymous volumes.
    async fn stop_and_remove(&self, id: &str) -> Result<(), RuntimeError>;

    /// Inspect a container's state and port bindings.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, RuntimeError>;

    /// Snapshot of the container's combined stdout and stderr.
    async fn logs(&self, id: &str) -> Result<String, RuntimeError>;
}
