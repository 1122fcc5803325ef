//! Collaborator contracts
//!
//! The execution core delegates all real work to these traits:
//! container placement, resource version checks, fetches, publishes,
//! and config-file reads. Callers supply implementations; the core
//! never performs I/O of its own during step construction.
//!
//! All collaborators are trait-based to enable testing and mocking.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use conveyor_core::build::{ContainerMetadata, Version};
use conveyor_core::config::TaskConfig;
use conveyor_core::plan::PlanId;

/// Parameters after secret substitution
pub type ResolvedParams = BTreeMap<String, serde_json::Value>;

/// Errors from the worker pool; opaque to the execution core
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("container placement failed: {0}")]
    Placement(String),

    #[error("worker resources exhausted: {0}")]
    ResourcesExhausted(String),

    #[error("worker error: {0}")]
    Other(String),
}

/// Errors from the resource backend; opaque to the execution core
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no matching version for resource '{resource}'")]
    NoMatchingVersion { resource: String },

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("version check error: {0}")]
    Check(String),
}

/// A fully resolved task handed to the worker pool for placement
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub plan_id: PlanId,
    pub step_name: String,
    pub team_id: Uuid,
    pub build_id: Uuid,
    pub job_id: Option<Uuid>,
    pub config: TaskConfig,
    pub privileged: bool,
    pub working_directory: String,
    /// Artifact from a previous step to use as the image, overriding
    /// the config's image
    pub image_artifact_name: Option<String>,
    pub input_mapping: BTreeMap<String, String>,
    pub output_mapping: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub metadata: ContainerMetadata,
}

/// Outcome of a placed task
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub exit_code: i32,
}

/// Container-placement collaborator
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Places and runs a task, blocking until it finishes
    async fn run_task(&self, spec: TaskSpec) -> std::result::Result<TaskOutcome, WorkerError>;
}

/// A fetch request against the resource backend
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub resource: String,
    pub resource_type: String,
    pub source: ResolvedParams,
    pub params: ResolvedParams,
    pub version: Version,
    pub tags: Vec<String>,
    pub metadata: ContainerMetadata,
}

/// A publish request against the resource backend
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub resource: String,
    pub resource_type: String,
    pub source: ResolvedParams,
    pub params: ResolvedParams,
    pub tags: Vec<String>,
    pub metadata: ContainerMetadata,
}

/// Resource fetch/publish/check collaborator
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Returns the latest version of a resource
    async fn check(
        &self,
        resource_type: &str,
        source: &ResolvedParams,
    ) -> std::result::Result<Version, ResourceError>;

    /// Fetches a concrete version's contents into the build
    async fn fetch(&self, request: FetchRequest)
    -> std::result::Result<Version, ResourceError>;

    /// Publishes build output, returning the produced version
    async fn publish(
        &self,
        request: PublishRequest,
    ) -> std::result::Result<Version, ResourceError>;
}

/// Read-only view of a step's container filesystem
///
/// Used by the config-source chain to read a task config file checked
/// into a fetched resource.
#[async_trait]
pub trait ContainerFs: Send + Sync {
    async fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>>;
}
