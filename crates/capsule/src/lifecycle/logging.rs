//! Logging decorators.
//!
//! Each decorator logs around exactly one call to its inner stage and hands
//! back the inner outcome untouched.

use std::sync::Arc;

use async_trait::async_trait;
use capsule_common::{CapsuleResult, ExecutionContext};
use tracing::{Instrument, Span};

use super::{Creator, StartError, Starter, Terminator};
use crate::container::{CreatedContainer, StartedContainer};
use crate::definition::ContainerDefinition;

/// Logs create attempts and outcomes.
#[derive(Debug, Clone)]
pub struct LoggingCreator {
    inner: Arc<dyn Creator>,
    span: Span,
}

impl LoggingCreator {
    /// Wrap `inner`, logging within `span`.
    pub fn new(inner: Arc<dyn Creator>, span: Span) -> Self {
        Self { inner, span }
    }
}

#[async_trait]
impl Creator for LoggingCreator {
    async fn create(
        &self,
        ctx: &ExecutionContext,
        definition: Arc<ContainerDefinition>,
    ) -> CapsuleResult<CreatedContainer> {
        async {
            tracing::info!(source = ?definition.image_source(), "Creating container");

            let result = self.inner.create(ctx, definition).await;
            match &result {
                Ok(created) => tracing::info!(container_id = %created.id(), "Created container"),
                Err(error) => tracing::error!(%error, "Failed to create container"),
            }
            result
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Logs start attempts and outcomes.
#[derive(Debug, Clone)]
pub struct LoggingStarter {
    inner: Arc<dyn Starter>,
    span: Span,
}

impl LoggingStarter {
    /// Wrap `inner`, logging within `span`.
    pub fn new(inner: Arc<dyn Starter>, span: Span) -> Self {
        Self { inner, span }
    }
}

#[async_trait]
impl Starter for LoggingStarter {
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError> {
        async {
            tracing::info!(container_id = %container.id(), "Starting container");

            let result = self.inner.start(ctx, container).await;
            match &result {
                Ok(started) => tracing::info!(container_id = %started.id(), "Started container"),
                Err(StartError::NotStarted { container, error }) => {
                    tracing::error!(
                        container_id = %container.id(),
                        %error,
                        "Failed to start container"
                    );
                }
                Err(StartError::NotReady { container, error }) => {
                    tracing::warn!(
                        container_id = %container.id(),
                        %error,
                        "Container started but is not ready"
                    );
                }
            }
            result
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Logs terminate attempts and outcomes.
#[derive(Debug, Clone)]
pub struct LoggingTerminator {
    inner: Arc<dyn Terminator>,
    span: Span,
}

impl LoggingTerminator {
    /// Wrap `inner`, logging within `span`.
    pub fn new(inner: Arc<dyn Terminator>, span: Span) -> Self {
        Self { inner, span }
    }
}

#[async_trait]
impl Terminator for LoggingTerminator {
    async fn terminate(
        &self,
        ctx: &ExecutionContext,
        container: &CreatedContainer,
    ) -> CapsuleResult<()> {
        async {
            tracing::info!(container_id = %container.id(), "Terminating container");

            let result = self.inner.terminate(ctx, container).await;
            match &result {
                Ok(()) => tracing::info!(container_id = %container.id(), "Terminated container"),
                Err(error) => {
                    tracing::error!(
                        container_id = %container.id(),
                        %error,
                        "Failed to terminate container"
                    );
                }
            }
            result
        }
        .instrument(self.span.clone())
        .await
    }
}
