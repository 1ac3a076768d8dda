//! Docker Engine implementation of [`RuntimeClient`] using the bollard crate.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::{API_DEFAULT_VERSION, Docker};
use capsule_common::{CapsuleError, CapsuleResult, ExposedPort, RuntimeError};
use capsule_image::ImageReference;
use futures::StreamExt;

use super::{ContainerInspection, CreateRequest, PortBinding, RuntimeClient};
use crate::config::OrchestratorConfig;

/// Docker client wrapper implementing the runtime capability.
#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: Docker,
    /// Host through which published ports are reachable.
    host: String,
    /// Stop grace period in seconds.
    stop_timeout: i64,
}

impl DockerClient {
    /// Connect to the Docker daemon described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Connect`] if the endpoint is unsupported or the
    /// client cannot be constructed.
    pub fn connect(config: &OrchestratorConfig) -> CapsuleResult<Self> {
        let timeout = config.connect_timeout_secs;
        let endpoint = config.docker_host.clone().unwrap_or_default();

        let connected = if endpoint.is_empty() {
            Docker::connect_with_local_defaults()
        } else if let Some(path) = endpoint.strip_prefix("unix://") {
            Docker::connect_with_unix(path, timeout, API_DEFAULT_VERSION)
        } else if endpoint.starts_with("tcp://") || endpoint.starts_with("http://") {
            Docker::connect_with_http(&endpoint, timeout, API_DEFAULT_VERSION)
        } else {
            return Err(CapsuleError::Connect {
                endpoint,
                message: "unsupported scheme, expected unix://, tcp:// or http://".to_string(),
            });
        };

        let docker = connected.map_err(|e| CapsuleError::Connect {
            endpoint: if endpoint.is_empty() {
                "local default".to_string()
            } else {
                endpoint.clone()
            },
            message: e.to_string(),
        })?;

        tracing::debug!(
            endpoint = %endpoint,
            host = %config.daemon_host(),
            "Connected Docker client"
        );

        Ok(Self::from_docker(docker, config))
    }

    /// Wrap an existing bollard client.
    #[must_use]
    pub fn from_docker(docker: Docker, config: &OrchestratorConfig) -> Self {
        Self {
            docker,
            host: config.daemon_host(),
            stop_timeout: i64::try_from(config.stop_timeout_secs).unwrap_or(i64::MAX),
        }
    }

    /// Pull `image` unless it is already present locally.
    async fn ensure_image(&self, request: &CreateRequest) -> Result<(), RuntimeError> {
        if self.docker.inspect_image(&request.image).await.is_ok() {
            return Ok(());
        }

        // A bare repository would pull every tag; pin it to the default tag.
        let from_image = ImageReference::parse(&request.image)
            .map_or_else(|_| request.image.clone(), |r| r.full_reference());

        tracing::info!(image = %from_image, platform = ?request.platform, "Pulling image");

        let options = CreateImageOptions {
            from_image: from_image.clone(),
            platform: request
                .platform
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(into_runtime_error)?;
        }

        tracing::debug!(image = %from_image, "Image pulled");
        Ok(())
    }
}

/// Map a bollard error onto the runtime failure carrier.
fn into_runtime_error(err: bollard::errors::Error) -> RuntimeError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound { what: message },
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Api {
            status: status_code,
            message,
        },
        other => RuntimeError::Transport(other.to_string()),
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        self.ensure_image(request).await?;

        let exposed_ports: HashMap<String, HashMap<(), ()>> = request
            .exposed_ports
            .iter()
            .map(|port| (port.to_string(), HashMap::new()))
            .collect();

        let host_config = HostConfig {
            publish_all_ports: Some(true),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(request.image.clone()),
            cmd: request.cmd.clone(),
            env: if request.env.is_empty() {
                None
            } else {
                Some(request.env.clone())
            },
            labels: Some(
                request
                    .labels
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = (request.name.is_some() || request.platform.is_some()).then(|| {
            CreateContainerOptions {
                name: request.name.clone().unwrap_or_default(),
                platform: request.platform.as_ref().map(ToString::to_string),
            }
        });

        let response = self
            .docker
            .create_container(options, container_config)
            .await
            .map_err(into_runtime_error)?;

        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, %warning, "Runtime warning on create");
        }

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(into_runtime_error)
    }

    async fn stop_and_remove(&self, id: &str) -> Result<(), RuntimeError> {
        let stop = StopContainerOptions {
            t: self.stop_timeout,
        };

        match self.docker.stop_container(id, Some(stop)).await {
            // 304: already stopped
            Ok(())
            | Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(into_runtime_error(e)),
        }

        let remove = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        self.docker
            .remove_container(id, Some(remove))
            .await
            .map_err(into_runtime_error)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, RuntimeError> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(into_runtime_error)?;

        let running = info
            .state
            .as_ref()
            .and_then(|state| state.running)
            .unwrap_or(false);

        let mut ports = Vec::new();
        let port_map = info
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default();

        for (key, bindings) in port_map {
            let Ok(container_port) = ExposedPort::parse(&key) else {
                tracing::debug!(container_id = %id, %key, "Ignoring unparsable port key");
                continue;
            };
            for binding in bindings.unwrap_or_default() {
                let Some(host_port) = binding.host_port.and_then(|p| p.parse::<u16>().ok()) else {
                    continue;
                };
                ports.push(PortBinding {
                    container_port,
                    host_ip: binding.host_ip.filter(|ip| !ip.is_empty()),
                    host_port,
                });
            }
        }

        Ok(ContainerInspection {
            host: self.host.clone(),
            running,
            ports,
        })
    }

    async fn logs(&self, id: &str) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            ..Default::default()
        };

        let mut logs = self.docker.logs(id, Some(options));
        let mut output = String::new();

        while let Some(chunk) = logs.next().await {
            match chunk.map_err(into_runtime_error)? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdIn { .. } => {}
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_keep_status() {
        let err = into_runtime_error(bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "conflict".to_string(),
        });
        assert_eq!(
            err,
            RuntimeError::Api {
                status: 409,
                message: "conflict".to_string()
            }
        );
    }

    #[test]
    fn missing_objects_map_to_not_found() {
        let err = into_runtime_error(bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".to_string(),
        });
        assert!(matches!(err, RuntimeError::NotFound { .. }));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let config = OrchestratorConfig::default().with_docker_host("ssh://box");
        let err = DockerClient::connect(&config).unwrap_err();
        assert!(matches!(err, CapsuleError::Connect { .. }));
    }

    #[tokio::test]
    async fn tcp_endpoint_reports_its_host() {
        let config = OrchestratorConfig::default().with_docker_host("tcp://192.0.2.10:2375");
        let client = DockerClient::connect(&config).unwrap();
        assert_eq!(client.host, "192.0.2.10");
        assert_eq!(client.stop_timeout, 10);
    }
}
