//! Task config sources
//!
//! The effective configuration of a task comes from zero or more
//! layers: an inline config in the plan, a config file checked into a
//! fetched resource, or both merged. Each layer is a source; wrapping
//! sources add validation and deprecation rewriting. The chain is built
//! at step construction but only resolved when the task action needs
//! its config, against the container filesystem view of that moment.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use conveyor_core::config::{RawTaskConfig, TaskConfig};
use conveyor_core::event::{StepEvent, StepEventKind};
use conveyor_core::plan::{PlanId, RawParams};

use crate::action::BuildEventDelegate;
use crate::error::{ExecError, Result};
use crate::worker::ContainerFs;

/// One layer of task configuration
#[async_trait]
pub trait TaskConfigSource: Send + Sync {
    /// Produces this source's configuration
    ///
    /// All-or-nothing: on error no partial configuration is visible.
    async fn fetch_config(&self, fs: &dyn ContainerFs) -> Result<RawTaskConfig>;
}

/// The plan's inline configuration, with plan-level params layered over
/// the config's params
pub struct StaticConfigSource {
    config: Option<TaskConfig>,
    plan_params: RawParams,
}

impl StaticConfigSource {
    pub fn new(config: Option<TaskConfig>, plan_params: RawParams) -> Self {
        Self {
            config,
            plan_params,
        }
    }
}

#[async_trait]
impl TaskConfigSource for StaticConfigSource {
    async fn fetch_config(&self, _fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        let mut raw = self
            .config
            .clone()
            .map(RawTaskConfig::from)
            .unwrap_or_default();
        for (name, value) in &self.plan_params {
            raw.params.insert(name.clone(), value.clone());
        }
        Ok(raw)
    }
}

/// A config file read from the container filesystem at resolve time
pub struct FileConfigSource {
    path: String,
}

impl FileConfigSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TaskConfigSource for FileConfigSource {
    async fn fetch_config(&self, fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        debug!("Reading task config from {}", self.path);
        let bytes =
            fs.read_file(&self.path)
                .await
                .map_err(|error| ExecError::ConfigFileUnreadable {
                    path: self.path.clone(),
                    message: error.to_string(),
                })?;
        Ok(RawTaskConfig::from_bytes(&bytes)?)
    }
}

/// Two layered sources, with `b` winning on any overlapping field
pub struct MergedConfigSource {
    a: Box<dyn TaskConfigSource>,
    b: Box<dyn TaskConfigSource>,
}

impl MergedConfigSource {
    pub fn new(a: Box<dyn TaskConfigSource>, b: Box<dyn TaskConfigSource>) -> Self {
        Self { a, b }
    }
}

#[async_trait]
impl TaskConfigSource for MergedConfigSource {
    async fn fetch_config(&self, fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        let base = self.a.fetch_config(fs).await?;
        let over = self.b.fetch_config(fs).await?;
        Ok(RawTaskConfig::merge(&base, &over))
    }
}

/// Rejects structurally invalid configurations
pub struct ValidatingConfigSource {
    delegate: Box<dyn TaskConfigSource>,
}

impl ValidatingConfigSource {
    pub fn new(delegate: Box<dyn TaskConfigSource>) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl TaskConfigSource for ValidatingConfigSource {
    async fn fetch_config(&self, fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        let config = self.delegate.fetch_config(fs).await?;
        config.validate()?;
        Ok(config)
    }
}

/// Rewrites obsolete field spellings, emitting a warning per rewrite
///
/// Never fails the resolution; warnings go to the step's events
/// delegate as non-fatal diagnostics.
pub struct DeprecationConfigSource {
    delegate: Box<dyn TaskConfigSource>,
    plan_id: PlanId,
    events: Arc<dyn BuildEventDelegate>,
}

impl DeprecationConfigSource {
    pub fn new(
        delegate: Box<dyn TaskConfigSource>,
        plan_id: PlanId,
        events: Arc<dyn BuildEventDelegate>,
    ) -> Self {
        Self {
            delegate,
            plan_id,
            events,
        }
    }
}

#[async_trait]
impl TaskConfigSource for DeprecationConfigSource {
    async fn fetch_config(&self, fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        let mut config = self.delegate.fetch_config(fs).await?;
        for message in config.rewrite_deprecated_fields() {
            self.events.on_event(StepEvent::now(
                self.plan_id.clone(),
                StepEventKind::Warning { message },
            ));
        }
        Ok(config)
    }
}

/// Terminal source for a plan node that declared no configuration
///
/// Construction never fails for missing config; this source defers the
/// failure to resolve time.
pub struct MissingConfigSource;

#[async_trait]
impl TaskConfigSource for MissingConfigSource {
    async fn fetch_config(&self, _fs: &dyn ContainerFs) -> Result<RawTaskConfig> {
        Err(ExecError::MissingTaskConfig)
    }
}
