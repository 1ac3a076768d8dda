//! # Capsule
//!
//! Capsule provisions throwaway containers for tests through a composable
//! pipeline: an image source resolves the reference, a creator allocates the
//! container, a starter runs it and waits for readiness, and a terminator
//! cleans it up.
//!
//! ## Features
//!
//! - **Decorated stages**: every stage is a trait object that options can wrap
//! - **Readiness strategies**: wait for log output or a listening port
//! - **Handle recovery**: failed runs hand back the container they reached
//! - **Cancellation**: every call honours a token and an optional deadline
//!
//! ## Usage
//!
//! ```no_run
//! use capsule::wait::for_log;
//! use capsule::{from_image, waiting_for, with_exposed_ports};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let definition = capsule::new_generic_container(
//!     from_image("nginx", []),
//!     [
//!         with_exposed_ports([80u16]),
//!         waiting_for(for_log("start worker process")),
//!     ],
//! )?;
//!
//! let container = capsule::run(&definition, []).await?;
//! let info = capsule::info(&container, []).await?;
//! println!("nginx at {}", info.endpoint("80/tcp")?);
//!
//! capsule::terminate(&container, []).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod container;
pub mod definition;
pub mod execution;
pub mod lifecycle;
pub mod orchestrator;
pub mod runtime;
pub mod wait;

pub use capsule_common::{
    CapsuleError, CapsuleResult, ContainerId, ExecutionContext, ExposedPort, Protocol,
    RuntimeError,
};
pub use capsule_image::{FromImage, ImageSource, Platform, from_image, with_image_platform};
pub use config::OrchestratorConfig;
pub use container::{ContainerInfo, CreatedContainer, StartedContainer};
pub use definition::{
    ContainerDefinition, DefinitionOption, waiting_for, with_cmd, with_env, with_exposed_ports,
    with_labels, with_name, with_start_logging, wrap_creator, wrap_starter, wrap_terminator,
};
pub use execution::{ExecutionOption, with_cancellation, with_context, with_timeout};
pub use lifecycle::{Creator, StartError, Starter, Terminator};
pub use orchestrator::{Orchestrator, RunError};
pub use tokio_util::sync::CancellationToken;

/// Build a definition on the default orchestrator.
///
/// # Errors
///
/// Returns the default orchestrator's configuration or connection error.
pub fn new_generic_container(
    source: impl ImageSource + 'static,
    options: impl IntoIterator<Item = DefinitionOption>,
) -> CapsuleResult<ContainerDefinition> {
    Ok(Orchestrator::global()?.new_generic_container(source, options))
}

/// Run a definition on the default orchestrator.
///
/// # Errors
///
/// See [`Orchestrator::run`].
pub async fn run(
    definition: &ContainerDefinition,
    options: impl IntoIterator<Item = ExecutionOption>,
) -> Result<StartedContainer, RunError> {
    Orchestrator::global()
        .map_err(RunError::Create)?
        .run(definition, options)
        .await
}

/// Inspect a container on the default orchestrator.
///
/// # Errors
///
/// See [`Orchestrator::info`].
pub async fn info(
    container: &StartedContainer,
    options: impl IntoIterator<Item = ExecutionOption>,
) -> CapsuleResult<ContainerInfo> {
    Orchestrator::global()?.info(container, options).await
}

/// Terminate a container on the default orchestrator.
///
/// # Errors
///
/// See [`Orchestrator::terminate`].
pub async fn terminate(
    container: &CreatedContainer,
    options: impl IntoIterator<Item = ExecutionOption>,
) -> CapsuleResult<()> {
    Orchestrator::global()?.terminate(container, options).await
}
