//! Runtime-backed base stages.

use std::sync::Arc;

use async_trait::async_trait;
use capsule_common::{CapsuleError, CapsuleResult, ContainerId, ExecutionContext};

use super::{Creator, StartError, Starter, Terminator};
use crate::container::{CreatedContainer, StartedContainer};
use crate::definition::ContainerDefinition;
use crate::runtime::{CreateRequest, RuntimeClient};

/// Label carrying the ID of the orchestrator session that created a container.
pub const SESSION_LABEL: &str = "capsule.session-id";
/// Label marking containers created by capsule.
pub const MANAGED_LABEL: &str = "capsule.managed";

/// Creates containers through the runtime client.
#[derive(Debug, Clone)]
pub struct RuntimeCreator {
    client: Arc<dyn RuntimeClient>,
    session_id: String,
}

impl RuntimeCreator {
    /// Create a creator labelling containers with `session_id`.
    pub fn new(client: Arc<dyn RuntimeClient>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
        }
    }

    fn request(&self, image: String, definition: &ContainerDefinition) -> CreateRequest {
        let mut labels = definition.labels().clone();
        labels.insert(SESSION_LABEL.to_string(), self.session_id.clone());
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());

        CreateRequest {
            image,
            platform: definition.image_source().platform().cloned(),
            exposed_ports: definition.exposed_ports().to_vec(),
            env: definition.env().to_vec(),
            cmd: definition.cmd().map(<[String]>::to_vec),
            labels,
            name: definition.name().map(ToString::to_string),
        }
    }
}

#[async_trait]
impl Creator for RuntimeCreator {
    async fn create(
        &self,
        ctx: &ExecutionContext,
        definition: Arc<ContainerDefinition>,
    ) -> CapsuleResult<CreatedContainer> {
        if let Some(value) = definition.invalid_ports().first() {
            return Err(CapsuleError::InvalidPort {
                value: value.clone(),
            });
        }

        let image = ctx.run(definition.image_source().prepare(ctx)).await?;
        let request = self.request(image, &definition);

        let id = ctx
            .run(async {
                self.client
                    .create_container(&request)
                    .await
                    .map_err(|source| CapsuleError::Create {
                        image: request.image.clone(),
                        source,
                    })
            })
            .await?;

        let id = ContainerId::from_runtime(id)?;
        Ok(CreatedContainer::new(id, definition))
    }
}

/// Starts containers through the runtime client.
#[derive(Debug, Clone)]
pub struct RuntimeStarter {
    client: Arc<dyn RuntimeClient>,
}

impl RuntimeStarter {
    /// Create a starter.
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Starter for RuntimeStarter {
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError> {
        let id = container.id().as_str();
        let result = ctx
            .run(async {
                self.client
                    .start_container(id)
                    .await
                    .map_err(|source| CapsuleError::Start {
                        id: id.to_string(),
                        source,
                    })
            })
            .await;

        match result {
            Ok(()) => Ok(StartedContainer::new(container)),
            Err(error) => Err(StartError::NotStarted { container, error }),
        }
    }
}

/// Stops and removes containers through the runtime client.
#[derive(Debug, Clone)]
pub struct RuntimeTerminator {
    client: Arc<dyn RuntimeClient>,
}

impl RuntimeTerminator {
    /// Create a terminator.
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Terminator for RuntimeTerminator {
    async fn terminate(
        &self,
        ctx: &ExecutionContext,
        container: &CreatedContainer,
    ) -> CapsuleResult<()> {
        let id = container.id().as_str();
        ctx.run(async {
            self.client
                .stop_and_remove(id)
                .await
                .map_err(|source| CapsuleError::Termination {
                    id: id.to_string(),
                    source,
                })
        })
        .await
    }
}
