//! Build identity and container metadata
//!
//! Structures that identify the build a step belongs to and describe
//! the container it will be placed in. Supplied per factory call by
//! the scheduler; the execution core only reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identity of the build a step is being constructed for
///
/// Team and pipeline names scope secret resolution; the IDs tie
/// constructed actions back to persisted build state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildContext {
    pub build_id: Uuid,
    pub team_id: Uuid,
    pub team_name: String,
    pub pipeline_name: String,
    /// Set for builds triggered by a job; one-off builds have none
    pub job_id: Option<Uuid>,
}

/// Metadata describing the container a step will run in
///
/// The working directory is filled in by the factory according to the
/// step kind; the rest is passed through to the worker pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerMetadata {
    pub step_name: String,
    pub working_directory: String,
    pub attempts: Vec<u32>,
}

/// A concrete resource version
///
/// Opaque key/value pairs as reported by the resource backend, e.g.
/// `{"ref": "abc123"}` for a git resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version(pub BTreeMap<String, String>);

impl Version {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new()
    }
}
