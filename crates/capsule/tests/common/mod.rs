//! In-memory runtime and recording stages shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use capsule::lifecycle::{Creator, StartError, Starter, Terminator};
use capsule::runtime::{ContainerInspection, CreateRequest, PortBinding, RuntimeClient};
use capsule::wait::{WaitStrategy, WaitTarget};
use capsule::{
    CapsuleResult, ContainerDefinition, ContainerId, CreatedContainer, ExecutionContext,
    RuntimeError, StartedContainer,
};
use parking_lot::{Mutex, MutexGuard};

/// Mutable state behind [`StubRuntime`].
#[derive(Debug)]
pub struct StubState {
    pub requests: Vec<CreateRequest>,
    pub create_calls: usize,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub inspect_calls: usize,
    pub log_calls: usize,
    pub create_failure: Option<RuntimeError>,
    pub start_failure: Option<RuntimeError>,
    pub stop_failure: Option<RuntimeError>,
    pub create_delay: Option<Duration>,
    /// ID returned by create instead of `stub-<n>`.
    pub assigned_id: Option<String>,
    /// Log reads that return output without the ready line.
    pub ready_after_log_polls: usize,
    pub host: String,
    pub ports: Vec<PortBinding>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            create_calls: 0,
            start_calls: 0,
            stop_calls: 0,
            inspect_calls: 0,
            log_calls: 0,
            create_failure: None,
            start_failure: None,
            stop_failure: None,
            create_delay: None,
            assigned_id: None,
            ready_after_log_polls: 0,
            host: "localhost".to_string(),
            ports: Vec::new(),
        }
    }
}

/// Runtime client that records calls instead of talking to an engine.
#[derive(Debug, Default)]
pub struct StubRuntime {
    state: Mutex<StubState>,
}

impl StubRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock()
    }
}

#[async_trait]
impl RuntimeClient for StubRuntime {
    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        let delay = {
            let mut state = self.state.lock();
            state.create_calls += 1;
            state.requests.push(request.clone());
            state.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        match &state.create_failure {
            Some(error) => Err(error.clone()),
            None => Ok(state
                .assigned_id
                .clone()
                .unwrap_or_else(|| format!("stub-{}", state.create_calls))),
        }
    }

    async fn start_container(&self, _id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.start_calls += 1;
        state.start_failure.clone().map_or(Ok(()), Err)
    }

    async fn stop_and_remove(&self, _id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        state.stop_failure.clone().map_or(Ok(()), Err)
    }

    async fn inspect_container(&self, _id: &str) -> Result<ContainerInspection, RuntimeError> {
        let mut state = self.state.lock();
        state.inspect_calls += 1;
        Ok(ContainerInspection {
            host: state.host.clone(),
            running: state.start_calls > 0,
            ports: state.ports.clone(),
        })
    }

    async fn logs(&self, _id: &str) -> Result<String, RuntimeError> {
        let mut state = self.state.lock();
        state.log_calls += 1;
        if state.log_calls > state.ready_after_log_polls {
            Ok("booting\nServer ready\n".to_string())
        } else {
            Ok("booting\n".to_string())
        }
    }
}

pub fn binding(port: &str, host_port: u16) -> PortBinding {
    PortBinding {
        container_port: port.parse().unwrap(),
        host_ip: Some("0.0.0.0".to_string()),
        host_port,
    }
}

/// Shared journal the recording stages append to.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Creator layer that records each call and delegates.
#[derive(Debug)]
pub struct RecordingCreator {
    inner: Arc<dyn Creator>,
    name: &'static str,
    journal: Journal,
}

impl RecordingCreator {
    pub fn wrap(inner: Arc<dyn Creator>, name: &'static str, journal: Journal) -> Arc<dyn Creator> {
        Arc::new(Self {
            inner,
            name,
            journal,
        })
    }
}

#[async_trait]
impl Creator for RecordingCreator {
    async fn create(
        &self,
        ctx: &ExecutionContext,
        definition: Arc<ContainerDefinition>,
    ) -> CapsuleResult<CreatedContainer> {
        self.journal.lock().push(format!("create {}", self.name));
        self.inner.create(ctx, definition).await
    }
}

/// Creator layer that keeps the ID of every container its inner creator made.
#[derive(Debug)]
pub struct CapturingCreator {
    inner: Arc<dyn Creator>,
    created: Arc<Mutex<Vec<ContainerId>>>,
}

impl CapturingCreator {
    pub fn wrap(
        inner: Arc<dyn Creator>,
        created: Arc<Mutex<Vec<ContainerId>>>,
    ) -> Arc<dyn Creator> {
        Arc::new(Self { inner, created })
    }
}

#[async_trait]
impl Creator for CapturingCreator {
    async fn create(
        &self,
        ctx: &ExecutionContext,
        definition: Arc<ContainerDefinition>,
    ) -> CapsuleResult<CreatedContainer> {
        let created = self.inner.create(ctx, definition).await?;
        self.created.lock().push(created.id().clone());
        Ok(created)
    }
}

/// Starter layer that records each call and delegates.
#[derive(Debug)]
pub struct RecordingStarter {
    inner: Arc<dyn Starter>,
    name: &'static str,
    journal: Journal,
}

impl RecordingStarter {
    pub fn wrap(inner: Arc<dyn Starter>, name: &'static str, journal: Journal) -> Arc<dyn Starter> {
        Arc::new(Self {
            inner,
            name,
            journal,
        })
    }
}

#[async_trait]
impl Starter for RecordingStarter {
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError> {
        self.journal.lock().push(format!("start {}", self.name));
        self.inner.start(ctx, container).await
    }
}

/// Terminator layer that records each call and delegates.
#[derive(Debug)]
pub struct RecordingTerminator {
    inner: Arc<dyn Terminator>,
    name: &'static str,
    journal: Journal,
}

impl RecordingTerminator {
    pub fn wrap(
        inner: Arc<dyn Terminator>,
        name: &'static str,
        journal: Journal,
    ) -> Arc<dyn Terminator> {
        Arc::new(Self {
            inner,
            name,
            journal,
        })
    }
}

#[async_trait]
impl Terminator for RecordingTerminator {
    async fn terminate(
        &self,
        ctx: &ExecutionContext,
        container: &CreatedContainer,
    ) -> CapsuleResult<()> {
        self.journal.lock().push(format!("terminate {}", self.name));
        self.inner.terminate(ctx, container).await
    }
}

/// Starter layer that cancels the execution context before delegating.
#[derive(Debug)]
pub struct CancellingStarter {
    inner: Arc<dyn Starter>,
}

impl CancellingStarter {
    pub fn wrap(inner: Arc<dyn Starter>) -> Arc<dyn Starter> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl Starter for CancellingStarter {
    async fn start(
        &self,
        ctx: &ExecutionContext,
        container: CreatedContainer,
    ) -> Result<StartedContainer, StartError> {
        ctx.cancel();
        self.inner.start(ctx, container).await
    }
}

/// Strategy that records its name and succeeds immediately.
#[derive(Debug)]
pub struct RecordingStrategy {
    pub name: &'static str,
    pub journal: Journal,
}

#[async_trait]
impl WaitStrategy for RecordingStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitTarget) -> CapsuleResult<()> {
        self.journal
            .lock()
            .push(format!("wait {} {}", self.name, target.id()));
        Ok(())
    }
}
