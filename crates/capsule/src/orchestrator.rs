//! Pipeline entry point.

use std::sync::Arc;

use capsule_common::{CapsuleError, CapsuleResult};
use capsule_image::ImageSource;
use miette::Diagnostic;
use once_cell::sync::OnceCell;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::container::{ContainerInfo, CreatedContainer, StartedContainer};
use crate::definition::{BaseStages, ContainerDefinition, DefinitionOption};
use crate::execution::{ExecutionConfiguration, ExecutionOption};
use crate::lifecycle::{
    LoggingCreator, LoggingTerminator, RuntimeCreator, RuntimeStarter, RuntimeTerminator,
    StartError,
};
use crate::runtime::{DockerClient, RuntimeClient};
use crate::wait::{ContainerTarget, WaitTarget};

static GLOBAL: OnceCell<Orchestrator> = OnceCell::new();

/// A failed run, carrying the most advanced handle reached.
#[derive(thiserror::Error, Diagnostic, Debug)]
pub enum RunError {
    /// No container was created.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Create(CapsuleError),

    /// A container exists but did not reach the ready state.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Start(StartError),
}

impl RunError {
    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &CapsuleError {
        match self {
            Self::Create(error) => error,
            Self::Start(error) => error.error(),
        }
    }

    /// Handle of the created container, if creation succeeded.
    #[must_use]
    pub fn created(&self) -> Option<&CreatedContainer> {
        match self {
            Self::Create(_) => None,
            Self::Start(error) => Some(error.created()),
        }
    }

    /// Handle of the running container, if the start call succeeded.
    #[must_use]
    pub const fn started(&self) -> Option<&StartedContainer> {
        match self {
            Self::Create(_) => None,
            Self::Start(error) => error.started(),
        }
    }
}

/// Owns the runtime client and wires default stage chains.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    client: Arc<dyn RuntimeClient>,
    session_id: String,
    span: Span,
}

impl Orchestrator {
    /// Create an orchestrator over `client` with a fresh session ID.
    pub fn new(client: Arc<dyn RuntimeClient>) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("capsule", session = %session_id);
        Self {
            client,
            session_id,
            span,
        }
    }

    /// Connect to the Docker daemon described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Connect`] when the endpoint is unusable.
    pub fn connect(config: &OrchestratorConfig) -> CapsuleResult<Self> {
        let client = DockerClient::connect(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Process-wide orchestrator, connected from [`OrchestratorConfig::load`]
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns the configuration or connection error of the first attempt;
    /// a later call tries again.
    pub fn global() -> CapsuleResult<&'static Self> {
        GLOBAL.get_or_try_init(|| {
            let config = OrchestratorConfig::load()?;
            let orchestrator = Self::connect(&config)?;
            tracing::debug!(session = %orchestrator.session_id, "Initialised default orchestrator");
            Ok(orchestrator)
        })
    }

    /// ID labelling every container this orchestrator creates.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The runtime client.
    #[must_use]
    pub const fn client(&self) -> &Arc<dyn RuntimeClient> {
        &self.client
    }

    /// Build a definition over the default stage chain, then apply `options`
    /// in order.
    pub fn new_generic_container(
        &self,
        source: impl ImageSource + 'static,
        options: impl IntoIterator<Item = DefinitionOption>,
    ) -> ContainerDefinition {
        let creator = LoggingCreator::new(
            Arc::new(RuntimeCreator::new(
                Arc::clone(&self.client),
                self.session_id.clone(),
            )),
            self.span.clone(),
        );
        let terminator = LoggingTerminator::new(
            Arc::new(RuntimeTerminator::new(Arc::clone(&self.client))),
            self.span.clone(),
        );

        let base = ContainerDefinition::new(
            Arc::new(source),
            BaseStages {
                creator: Arc::new(creator),
                starter: Arc::new(RuntimeStarter::new(Arc::clone(&self.client))),
                terminator: Arc::new(terminator),
                runtime: Arc::clone(&self.client),
                span: self.span.clone(),
            },
        );

        options.into_iter().fold(base, ContainerDefinition::with)
    }

    /// Create and start a container from a snapshot of `definition`.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Nothing is rolled back: a container
    /// created before the failure is reachable through the error.
    pub async fn run(
        &self,
        definition: &ContainerDefinition,
        options: impl IntoIterator<Item = ExecutionOption>,
    ) -> Result<StartedContainer, RunError> {
        let config = ExecutionConfiguration::from_options(options);
        let ctx = &config.context;
        let definition = Arc::new(definition.clone());

        async {
            let created = definition
                .creator()
                .create(ctx, Arc::clone(&definition))
                .await
                .map_err(RunError::Create)?;

            definition
                .starter()
                .start(ctx, created)
                .await
                .map_err(RunError::Start)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Host and port mapping of a started container.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Inspect`] when the runtime cannot inspect it.
    pub async fn info(
        &self,
        container: &StartedContainer,
        options: impl IntoIterator<Item = ExecutionOption>,
    ) -> CapsuleResult<ContainerInfo> {
        let config = ExecutionConfiguration::from_options(options);
        let target = ContainerTarget::new(container.definition().runtime().as_ref(), container);
        config.context.run(target.info()).await
    }

    /// Stop and remove a container through its definition's terminator chain.
    ///
    /// # Errors
    ///
    /// Returns the terminator's error.
    pub async fn terminate(
        &self,
        container: &CreatedContainer,
        options: impl IntoIterator<Item = ExecutionOption>,
    ) -> CapsuleResult<()> {
        let config = ExecutionConfiguration::from_options(options);
        container.terminate(&config.context).await
    }
}
