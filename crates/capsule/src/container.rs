//! Container handles and inspection results.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use capsule_common::{CapsuleError, CapsuleResult, ContainerId, ExecutionContext, ExposedPort};

use crate::definition::ContainerDefinition;
use crate::runtime::ContainerInspection;

/// A container that exists on the runtime but has not been started.
///
/// Only the runtime-backed creator produces these.
#[derive(Debug, Clone)]
pub struct CreatedContainer {
    id: ContainerId,
    definition: Arc<ContainerDefinition>,
}

impl CreatedContainer {
    pub(crate) const fn new(id: ContainerId, definition: Arc<ContainerDefinition>) -> Self {
        Self { id, definition }
    }

    /// Runtime-assigned container ID.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// The definition this container was created from.
    #[must_use]
    pub fn definition(&self) -> &ContainerDefinition {
        &self.definition
    }

    /// Stop and remove this container through its definition's terminator.
    ///
    /// # Errors
    ///
    /// Returns the terminator's error; the container may remain allocated.
    pub async fn terminate(&self, ctx: &ExecutionContext) -> CapsuleResult<()> {
        self.definition.terminator().terminate(ctx, self).await
    }
}

/// A created container that passed the runtime start call.
///
/// Only the runtime-backed starter produces these, from a [`CreatedContainer`]
/// with the same ID.
#[derive(Debug, Clone)]
pub struct StartedContainer {
    created: CreatedContainer,
}

impl StartedContainer {
    pub(crate) const fn new(created: CreatedContainer) -> Self {
        Self { created }
    }

    /// The underlying created-container handle.
    #[must_use]
    pub const fn as_created(&self) -> &CreatedContainer {
        &self.created
    }

    /// Give up the running tag, e.g. to hand the handle to a terminator.
    #[must_use]
    pub fn into_created(self) -> CreatedContainer {
        self.created
    }
}

impl Deref for StartedContainer {
    type Target = CreatedContainer;

    fn deref(&self) -> &Self::Target {
        &self.created
    }
}

/// Externally addressable connection data of a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    id: ContainerId,
    host: String,
    ports: BTreeMap<ExposedPort, u16>,
}

impl ContainerInfo {
    /// Build connection data from an inspection, preferring IPv4 bindings.
    pub(crate) fn from_inspection(id: ContainerId, inspection: ContainerInspection) -> Self {
        let mut ports: BTreeMap<ExposedPort, (u16, bool)> = BTreeMap::new();

        for binding in inspection.ports {
            let ipv6 = binding.host_ip.as_deref().is_some_and(|ip| ip.contains(':'));
            match ports.get(&binding.container_port) {
                Some((_, existing_ipv6)) if !(*existing_ipv6 && !ipv6) => {}
                _ => {
                    ports.insert(binding.container_port, (binding.host_port, ipv6));
                }
            }
        }

        Self {
            id,
            host: inspection.host,
            ports: ports
                .into_iter()
                .map(|(port, (host_port, _))| (port, host_port))
                .collect(),
        }
    }

    /// Host through which mapped ports are reachable.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host port bound to `port` (`"80"`, `"80/tcp"`, `80` or an [`ExposedPort`]).
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidPort`] when `port` does not parse and
    /// [`CapsuleError::PortNotMapped`] when it has no host binding.
    pub fn mapped_port<P>(&self, port: P) -> CapsuleResult<u16>
    where
        P: TryInto<ExposedPort>,
        CapsuleError: From<P::Error>,
    {
        let port = port.try_into()?;
        self.ports
            .get(&port)
            .copied()
            .ok_or_else(|| CapsuleError::PortNotMapped {
                id: self.id.to_string(),
                port: port.to_string(),
            })
    }

    /// `host:port` address of a mapped port.
    ///
    /// # Errors
    ///
    /// Same as [`ContainerInfo::mapped_port`].
    pub fn endpoint<P>(&self, port: P) -> CapsuleResult<String>
    where
        P: TryInto<ExposedPort>,
        CapsuleError: From<P::Error>,
    {
        let host_port = self.mapped_port(port)?;
        if self.host.contains(':') {
            Ok(format!("[{}]:{host_port}", self.host))
        } else {
            Ok(format!("{}:{host_port}", self.host))
        }
    }

    /// All mapped ports.
    pub fn ports(&self) -> impl Iterator<Item = (ExposedPort, u16)> + '_ {
        self.ports.iter().map(|(port, host_port)| (*port, *host_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::PortBinding;

    fn binding(port: &str, host_ip: &str, host_port: u16) -> PortBinding {
        PortBinding {
            container_port: port.parse().unwrap(),
            host_ip: Some(host_ip.to_string()),
            host_port,
        }
    }

    fn info(bindings: Vec<PortBinding>) -> ContainerInfo {
        ContainerInfo::from_inspection(
            ContainerId::new("abc").unwrap(),
            ContainerInspection {
                host: "localhost".to_string(),
                running: true,
                ports: bindings,
            },
        )
    }

    #[test]
    fn mapped_port_accepts_several_spellings() {
        let info = info(vec![binding("80/tcp", "0.0.0.0", 32768)]);
        assert_eq!(info.host(), "localhost");
        assert_eq!(info.mapped_port("80").unwrap(), 32768);
        assert_eq!(info.mapped_port("80/tcp").unwrap(), 32768);
        assert_eq!(info.mapped_port(80u16).unwrap(), 32768);
        assert_eq!(info.mapped_port(ExposedPort::tcp(80)).unwrap(), 32768);
        assert_eq!(info.endpoint("80").unwrap(), "localhost:32768");
    }

    #[test]
    fn ipv4_binding_preferred() {
        let info = info(vec![
            binding("80/tcp", "::", 40000),
            binding("80/tcp", "0.0.0.0", 40001),
            binding("80/tcp", "::", 40002),
        ]);
        assert_eq!(info.mapped_port("80").unwrap(), 40001);
    }

    #[test]
    fn unmapped_and_invalid_ports_are_errors() {
        let info = info(vec![binding("80/tcp", "0.0.0.0", 32768)]);
        assert!(matches!(
            info.mapped_port("80/udp"),
            Err(CapsuleError::PortNotMapped { .. })
        ));
        assert!(matches!(
            info.mapped_port("eighty"),
            Err(CapsuleError::InvalidPort { .. })
        ));
    }
}
