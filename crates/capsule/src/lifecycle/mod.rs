//! Container lifecycle stages.
//!
//! Each stage is a single-method capability. Base implementations talk to
//! the runtime; decorators hold an inner implementation of the same trait,
//! delegate to it exactly once per call and forward its outcome.

mod awaiting;
mod logging;
mod runtime;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use capsule_common::{CapsuleError, CapsuleResult, ExecutionContext};
use miette::Diagnostic;

use crate::container::{CreatedContainer, StartedContainer};
use crate::definition::ContainerDefinition;

pub use awaiting::AwaitingStarter;
pub use logging::{LoggingCreator, LoggingStarter, LoggingTerminator};
pub use runtime::{MANAGED_LABEL, RuntimeCreator, RuntimeStarter, RuntimeTerminator, SESSION_LABEL};

/// Turns a definition into a created, not yet running, container.
#[async_trait]
pub trait Creator: Send + Sync + fmt::Debug {
    /// Create the container described by `definition`.
    async fn create(
        &self,
        ctx: &ExecutionContext,
        definition: Arc<ContainerDefinition>,
    ) -> CapsuleResult<CreatedContainer>;
}

/// Transitions a created container to running.
#[async_trait]
pub trait Starter: Send + Sync + fmt::Debug {
    /// Start `container`. On failure the handle comes back inside the error.
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError>;
}

/// Stops and removes a container.
#[async_trait]
pub trait Terminator: Send + Sync + fmt::Debug {
    /// Terminate `container`.
    async fn terminate(&self, ctx: &ExecutionContext, container: &CreatedContainer)
    -> CapsuleResult<()>;
}

/// A failed start, carrying the most advanced handle reached.
#[derive(thiserror::Error, Diagnostic, Debug)]
pub enum StartError {
    /// The start call failed; the container is still allocated.
    #[error("container {} was created but not started", .container.id())]
    #[diagnostic(
        code(capsule::start::not_started),
        help("The container still exists; terminate it to release it")
    )]
    NotStarted {
        /// Handle of the allocated container.
        container: CreatedContainer,
        /// Why the start failed.
        #[source]
        error: CapsuleError,
    },

    /// The container runs but its readiness check failed.
    #[error("container {} started but is not ready", .container.id())]
    #[diagnostic(
        code(capsule::start::not_ready),
        help("The container is running; inspect its logs or terminate it")
    )]
    NotReady {
        /// Handle of the running container.
        container: StartedContainer,
        /// Why the readiness check failed.
        #[source]
        error: CapsuleError,
    },
}

impl StartError {
    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &CapsuleError {
        match self {
            Self::NotStarted { error, .. } | Self::NotReady { error, .. } => error,
        }
    }

    /// Handle of the container, started or not.
    #[must_use]
    pub fn created(&self) -> &CreatedContainer {
        match self {
            Self::NotStarted { container, .. } => container,
            Self::NotReady { container, .. } => container.as_created(),
        }
    }

    /// Handle of the running container, if the start call succeeded.
    #[must_use]
    pub const fn started(&self) -> Option<&StartedContainer> {
        match self {
            Self::NotStarted { .. } => None,
            Self::NotReady { container, .. } => Some(container),
        }
    }

    /// Split into the created handle and the error.
    #[must_use]
    pub fn into_parts(self) -> (CreatedContainer, CapsuleError) {
        match self {
            Self::NotStarted { container, error } => (container, error),
            Self::NotReady { container, error } => (container.into_created(), error),
        }
    }
}
