//! Readiness-awaiting starter.

use std::sync::Arc;

use async_trait::async_trait;
use capsule_common::ExecutionContext;

use super::{StartError, Starter};
use crate::container::{CreatedContainer, StartedContainer};
use crate::runtime::RuntimeClient;
use crate::wait::{ContainerTarget, WaitStrategy};

/// Runs a readiness strategy once the inner starter succeeds.
#[derive(Debug, Clone)]
pub struct AwaitingStarter {
    inner: Arc<dyn Starter>,
    strategy: Arc<dyn WaitStrategy>,
    runtime: Arc<dyn RuntimeClient>,
}

impl AwaitingStarter {
    /// Wrap `inner`, waiting with `strategy` against containers on `runtime`.
    pub fn new(
        inner: Arc<dyn Starter>,
        strategy: Arc<dyn WaitStrategy>,
        runtime: Arc<dyn RuntimeClient>,
    ) -> Self {
        Self {
            inner,
            strategy,
            runtime,
        }
    }
}

#[async_trait]
impl Starter for AwaitingStarter {
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError> {
        let started = self.inner.start(ctx, container).await?;

        tracing::debug!(
            container_id = %started.id(),
            strategy = ?self.strategy,
            "Waiting for container readiness"
        );

        let waited = {
            let target = ContainerTarget::new(self.runtime.as_ref(), &started);
            ctx.run(self.strategy.wait_until_ready(&target)).await
        };

        match waited {
            Ok(()) => {
                tracing::debug!(container_id = %started.id(), "Container ready");
                Ok(started)
            }
            Err(error) => Err(StartError::NotReady {
                container: started,
                error,
            }),
        }
    }
}
