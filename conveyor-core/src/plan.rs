//! Build plan types
//!
//! A build plan arrives as an already-parsed tree of typed nodes. Each
//! node describes one step (get/put/task); the execution core turns a
//! node plus build context into a runnable step. Nodes are immutable
//! once constructed and owned by the plan tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::build::Version;
use crate::config::TaskConfig;

/// Identifier of one node in a build plan
///
/// Unique within a single build's plan; stable for the lifetime of the
/// build so that later nodes can refer back to earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw key/value parameters as they appear in the plan
///
/// Values may embed `((secret.path))` references that are substituted
/// lazily at execution time.
pub type RawParams = BTreeMap<String, serde_json::Value>;

/// One node of a build plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub step: PlanStep,
}

/// The step a plan node declares
///
/// Closed set: the factory dispatches exhaustively over these kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanStep {
    Get(GetPlan),
    Put(PutPlan),
    Task(TaskPlan),
}

/// A fetch step: pull a version of a resource into the build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPlan {
    pub name: String,
    pub resource: String,
    pub resource_type: String,
    pub source: RawParams,
    pub params: RawParams,
    pub tags: Vec<String>,
    /// Pinned version; `None` means fetch the latest
    pub version: Option<Version>,
}

/// A publish step: push build output to a resource, producing a version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutPlan {
    pub name: String,
    pub resource: String,
    pub resource_type: String,
    pub source: RawParams,
    pub params: RawParams,
    pub tags: Vec<String>,
}

/// A run step: execute a task in a container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub name: String,
    pub privileged: bool,
    /// Inline task configuration, if the plan declares one
    pub config: Option<TaskConfig>,
    /// Path to a config file inside a fetched resource, if declared
    pub config_path: Option<String>,
    /// Plan-level params merged over the config's params at resolve time
    pub params: RawParams,
    /// Artifact provided by a previous step to use as the task image
    pub image_artifact_name: Option<String>,
    pub input_mapping: BTreeMap<String, String>,
    pub output_mapping: BTreeMap<String, String>,
    pub tags: Vec<String>,
}
