//! Container definitions and the options that build them.
//!
//! A [`ContainerDefinition`] is assembled by folding [`DefinitionOption`]s
//! over a default stage chain. Options that wrap a stage make the new layer
//! the outermost one, so the order options are supplied in is the order
//! their layers run in.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use capsule_common::ExposedPort;
use capsule_image::ImageSource;
use tracing::Span;

use crate::lifecycle::{AwaitingStarter, Creator, LoggingStarter, Starter, Terminator};
use crate::runtime::RuntimeClient;
use crate::wait::WaitStrategy;

/// Everything needed to provision one container.
///
/// Running a definition snapshots it, so later changes never affect a
/// container already in flight.
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    image_source: Arc<dyn ImageSource>,
    exposed_ports: Vec<ExposedPort>,
    invalid_ports: Vec<String>,
    env: Vec<String>,
    cmd: Option<Vec<String>>,
    labels: BTreeMap<String, String>,
    name: Option<String>,
    creator: Arc<dyn Creator>,
    starter: Arc<dyn Starter>,
    terminator: Arc<dyn Terminator>,
    runtime: Arc<dyn RuntimeClient>,
    span: Span,
}

/// The base stages a definition starts from.
pub(crate) struct BaseStages {
    pub creator: Arc<dyn Creator>,
    pub starter: Arc<dyn Starter>,
    pub terminator: Arc<dyn Terminator>,
    pub runtime: Arc<dyn RuntimeClient>,
    pub span: Span,
}

impl ContainerDefinition {
    pub(crate) fn new(image_source: Arc<dyn ImageSource>, stages: BaseStages) -> Self {
        Self {
            image_source,
            exposed_ports: Vec::new(),
            invalid_ports: Vec::new(),
            env: Vec::new(),
            cmd: None,
            labels: BTreeMap::new(),
            name: None,
            creator: stages.creator,
            starter: stages.starter,
            terminator: stages.terminator,
            runtime: stages.runtime,
            span: stages.span,
        }
    }

    /// Apply one more option.
    #[must_use]
    pub fn with(mut self, option: DefinitionOption) -> Self {
        option.apply(&mut self);
        self
    }

    /// Image source the container is created from.
    #[must_use]
    pub fn image_source(&self) -> &dyn ImageSource {
        self.image_source.as_ref()
    }

    /// Exposed ports in declaration order, duplicates included.
    #[must_use]
    pub fn exposed_ports(&self) -> &[ExposedPort] {
        &self.exposed_ports
    }

    /// Port values that failed to parse, reported when the container is
    /// created.
    pub(crate) fn invalid_ports(&self) -> &[String] {
        &self.invalid_ports
    }

    /// Environment variables (`KEY=value`).
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Command override.
    #[must_use]
    pub fn cmd(&self) -> Option<&[String]> {
        self.cmd.as_deref()
    }

    /// User labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Requested container name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Outermost creator.
    #[must_use]
    pub fn creator(&self) -> &dyn Creator {
        self.creator.as_ref()
    }

    /// Outermost starter.
    #[must_use]
    pub fn starter(&self) -> &dyn Starter {
        self.starter.as_ref()
    }

    /// Outermost terminator.
    #[must_use]
    pub fn terminator(&self) -> &dyn Terminator {
        self.terminator.as_ref()
    }

    /// Runtime client the stages talk to.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn RuntimeClient> {
        &self.runtime
    }
}

/// A mutation applied to a definition under construction.
pub struct DefinitionOption(Box<dyn FnOnce(&mut ContainerDefinition) + Send>);

impl DefinitionOption {
    /// Wrap an arbitrary mutation.
    pub fn new(mutate: impl FnOnce(&mut ContainerDefinition) + Send + 'static) -> Self {
        Self(Box::new(mutate))
    }

    pub(crate) fn apply(self, definition: &mut ContainerDefinition) {
        (self.0)(definition);
    }
}

impl fmt::Debug for DefinitionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionOption").finish_non_exhaustive()
    }
}

/// Append ports to publish (`80`, `"80/tcp"`, `"53/udp"` or an
/// [`ExposedPort`]). Duplicates are kept.
///
/// A value that does not parse makes creation fail with
/// [`CapsuleError::InvalidPort`](capsule_common::CapsuleError::InvalidPort)
/// before the runtime is called.
pub fn with_exposed_ports<P>(ports: impl IntoIterator<Item = P>) -> DefinitionOption
where
    P: TryInto<ExposedPort> + fmt::Display,
{
    let mut parsed: Vec<ExposedPort> = Vec::new();
    let mut invalid: Vec<String> = Vec::new();
    for port in ports {
        let value = port.to_string();
        match TryInto::<ExposedPort>::try_into(port) {
            Ok(port) => parsed.push(port),
            Err(_) => invalid.push(value),
        }
    }

    DefinitionOption::new(move |definition| {
        definition.exposed_ports.extend(parsed);
        definition.invalid_ports.extend(invalid);
    })
}

/// Wait for `strategy` after the container starts.
///
/// Each call adds one readiness layer; layers wait in the order supplied.
pub fn waiting_for(strategy: impl WaitStrategy + 'static) -> DefinitionOption {
    DefinitionOption::new(move |definition| {
        definition.starter = Arc::new(AwaitingStarter::new(
            Arc::clone(&definition.starter),
            Arc::new(strategy),
            Arc::clone(&definition.runtime),
        ));
    })
}

/// Add an environment variable.
pub fn with_env(key: impl Into<String>, value: impl Into<String>) -> DefinitionOption {
    let entry = format!("{}={}", key.into(), value.into());
    DefinitionOption::new(move |definition| definition.env.push(entry))
}

/// Override the image command.
pub fn with_cmd<S: Into<String>>(cmd: impl IntoIterator<Item = S>) -> DefinitionOption {
    let cmd: Vec<String> = cmd.into_iter().map(Into::into).collect();
    DefinitionOption::new(move |definition| definition.cmd = Some(cmd))
}

/// Add container labels. Later values replace earlier ones for the same key.
pub fn with_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> DefinitionOption
where
    K: Into<String>,
    V: Into<String>,
{
    let labels: Vec<(String, String)> = labels
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    DefinitionOption::new(move |definition| definition.labels.extend(labels))
}

/// Set the container name.
pub fn with_name(name: impl Into<String>) -> DefinitionOption {
    let name = name.into();
    DefinitionOption::new(move |definition| definition.name = Some(name))
}

/// Log start attempts and outcomes around the current starter.
#[must_use]
pub fn with_start_logging() -> DefinitionOption {
    DefinitionOption::new(|definition| {
        definition.starter = Arc::new(LoggingStarter::new(
            Arc::clone(&definition.starter),
            definition.span.clone(),
        ));
    })
}

/// Replace the creator with a layer built around the current one.
pub fn wrap_creator(
    wrap: impl FnOnce(Arc<dyn Creator>) -> Arc<dyn Creator> + Send + 'static,
) -> DefinitionOption {
    DefinitionOption::new(move |definition| {
        definition.creator = wrap(Arc::clone(&definition.creator));
    })
}

/// Replace the starter with a layer built around the current one.
pub fn wrap_starter(
    wrap: impl FnOnce(Arc<dyn Starter>) -> Arc<dyn Starter> + Send + 'static,
) -> DefinitionOption {
    DefinitionOption::new(move |definition| {
        definition.starter = wrap(Arc::clone(&definition.starter));
    })
}

/// Replace the terminator with a layer built around the current one.
pub fn wrap_terminator(
    wrap: impl FnOnce(Arc<dyn Terminator>) -> Arc<dyn Terminator> + Send + 'static,
) -> DefinitionOption {
    DefinitionOption::new(move |definition| {
        definition.terminator = wrap(Arc::clone(&definition.terminator));
    })
}
