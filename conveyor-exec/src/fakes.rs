//! In-memory test doubles for the collaborator traits

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use conveyor_core::build::Version;
use conveyor_core::event::{StepEvent, StepEventKind};
use conveyor_core::plan::PlanId;

use crate::action::{Action, BuildEventDelegate, ExecContext};
use crate::creds::{SecretError, SecretStore};
use crate::error::{ExecError, Result};
use crate::worker::{
    ContainerFs, FetchRequest, PublishRequest, ResolvedParams, ResourceBackend, ResourceError,
    TaskOutcome, TaskSpec, WorkerError, WorkerPool,
};

/// Installs a subscriber so traced output shows under --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Secret store backed by a fixed map, counting lookups
pub struct StaticSecretStore {
    secrets: HashMap<String, serde_json::Value>,
    lookups: Arc<AtomicUsize>,
}

impl StaticSecretStore {
    pub fn with(pairs: &[(&str, serde_json::Value)]) -> Self {
        Self {
            secrets: pairs
                .iter()
                .map(|(path, value)| (path.to_string(), value.clone()))
                .collect(),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn lookup_count(&self) -> Arc<AtomicUsize> {
        self.lookups.clone()
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn lookup(
        &self,
        _team_name: &str,
        _pipeline_name: &str,
        path: &str,
    ) -> std::result::Result<serde_json::Value, SecretError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.secrets.get(path).cloned().ok_or(SecretError::NotFound)
    }
}

/// Filesystem view with no files
pub struct NullFs;

#[async_trait]
impl ContainerFs for NullFs {
    async fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file: {}", path),
        ))
    }
}

/// Filesystem view backed by a path -> contents map
pub struct InMemoryFs {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryFs {
    pub fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, contents)| (path.to_string(), contents.as_bytes().to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl ContainerFs for InMemoryFs {
    async fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path),
            )
        })
    }
}

/// Delegate that records every event it receives
pub struct CollectingDelegate {
    events: Mutex<Vec<StepEvent>>,
}

impl CollectingDelegate {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn kinds(&self) -> Vec<StepEventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.kind.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match &event.kind {
                StepEventKind::Warning { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl BuildEventDelegate for CollectingDelegate {
    fn on_event(&self, event: StepEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Scripted action for exercising the step wrapper
pub struct StubAction {
    plan_id: PlanId,
    behavior: StubBehavior,
}

enum StubBehavior {
    Succeed,
    Fail,
    Hang,
}

impl StubAction {
    pub fn succeeding(plan_id: &str) -> Self {
        Self {
            plan_id: PlanId::new(plan_id),
            behavior: StubBehavior::Succeed,
        }
    }

    pub fn failing(plan_id: &str) -> Self {
        Self {
            plan_id: PlanId::new(plan_id),
            behavior: StubBehavior::Fail,
        }
    }

    pub fn hanging(plan_id: &str) -> Self {
        Self {
            plan_id: PlanId::new(plan_id),
            behavior: StubBehavior::Hang,
        }
    }
}

#[async_trait]
impl Action for StubAction {
    fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    async fn execute(&self, _ctx: &ExecContext) -> Result<()> {
        match self.behavior {
            StubBehavior::Succeed => Ok(()),
            StubBehavior::Fail => Err(ExecError::Worker(WorkerError::Other(
                "stub failure".to_string(),
            ))),
            StubBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Resource backend that serves scripted versions and records requests
pub struct FakeResourceBackend {
    latest: Option<Version>,
    published: Option<Version>,
    pub checks: Mutex<Vec<(String, ResolvedParams)>>,
    pub fetches: Mutex<Vec<FetchRequest>>,
    pub publishes: Mutex<Vec<PublishRequest>>,
}

impl FakeResourceBackend {
    pub fn new() -> Self {
        Self {
            latest: None,
            published: None,
            checks: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            publishes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latest(mut self, version: Version) -> Self {
        self.latest = Some(version);
        self
    }

    pub fn with_published(mut self, version: Version) -> Self {
        self.published = Some(version);
        self
    }
}

#[async_trait]
impl ResourceBackend for FakeResourceBackend {
    async fn check(
        &self,
        resource_type: &str,
        source: &ResolvedParams,
    ) -> std::result::Result<Version, ResourceError> {
        self.checks
            .lock()
            .unwrap()
            .push((resource_type.to_string(), source.clone()));
        self.latest
            .clone()
            .ok_or_else(|| ResourceError::NoMatchingVersion {
                resource: resource_type.to_string(),
            })
    }

    async fn fetch(
        &self,
        request: FetchRequest,
    ) -> std::result::Result<Version, ResourceError> {
        let version = request.version.clone();
        self.fetches.lock().unwrap().push(request);
        Ok(version)
    }

    async fn publish(
        &self,
        request: PublishRequest,
    ) -> std::result::Result<Version, ResourceError> {
        self.publishes.lock().unwrap().push(request);
        self.published
            .clone()
            .ok_or_else(|| ResourceError::Publish("no published version scripted".to_string()))
    }
}

/// Worker pool that records task specs and returns a scripted exit code
pub struct FakeWorkerPool {
    exit_code: i32,
    pub tasks: Mutex<Vec<TaskSpec>>,
}

impl FakeWorkerPool {
    pub fn with_exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            tasks: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WorkerPool for FakeWorkerPool {
    async fn run_task(&self, spec: TaskSpec) -> std::result::Result<TaskOutcome, WorkerError> {
        self.tasks.lock().unwrap().push(spec);
        Ok(TaskOutcome {
            exit_code: self.exit_code,
        })
    }
}

/// Builds resolved params from literal pairs
pub fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), serde_json::json!(value)))
        .collect()
}
