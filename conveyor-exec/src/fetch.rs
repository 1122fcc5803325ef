//! Fetch ("get") action
//!
//! Pulls a version of a resource into the build. Which version depends
//! on the action's version source: pinned in the plan, the latest
//! according to the backend, or deferred to a publish action registered
//! earlier in the same translation pass.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use conveyor_core::build::{ContainerMetadata, Version};
use conveyor_core::plan::{GetPlan, PlanId};

use crate::action::{Action, ExecContext};
use crate::creds::{CredParams, CredSource};
use crate::error::{ExecError, Result};
use crate::publish::PublishAction;
use crate::registry::PublishRegistry;
use crate::worker::{FetchRequest, ResolvedParams, ResourceBackend};

/// Where a fetch finds the version it should pull
pub enum VersionSource {
    /// The plan pinned an exact version
    Pinned(Version),
    /// Ask the backend for the latest version at execution time
    Latest,
    /// Defer to a publish action from the same translation pass
    FromPublish(Arc<PublishAction>),
}

impl VersionSource {
    /// Chooses the version source for a get plan
    ///
    /// A publish registered under the same plan-node ID always wins;
    /// otherwise the plan's pin, if any; otherwise the latest.
    pub fn from_plan(plan_id: &PlanId, get: &GetPlan, registry: &PublishRegistry) -> Self {
        if let Some(publish) = registry.lookup(plan_id) {
            return VersionSource::FromPublish(publish);
        }
        match &get.version {
            Some(version) => VersionSource::Pinned(version.clone()),
            None => VersionSource::Latest,
        }
    }

    async fn resolve(
        &self,
        backend: &dyn ResourceBackend,
        resource_type: &str,
        source: &ResolvedParams,
    ) -> Result<Version> {
        match self {
            VersionSource::Pinned(version) => Ok(version.clone()),
            VersionSource::Latest => Ok(backend.check(resource_type, source).await?),
            VersionSource::FromPublish(publish) => publish.produced_version().ok_or_else(|| {
                ExecError::PublishProducedNoVersion {
                    plan_id: publish.plan_id().to_string(),
                }
            }),
        }
    }
}

/// Execution-ready fetch behavior for one plan node
pub struct FetchAction {
    pub(crate) plan_id: PlanId,
    pub(crate) name: String,
    pub(crate) resource: String,
    pub(crate) resource_type: String,
    pub(crate) source: CredSource,
    pub(crate) params: CredParams,
    pub(crate) version_source: VersionSource,
    pub(crate) tags: Vec<String>,
    /// A fetch produces exactly one output, named after the node
    pub(crate) outputs: Vec<String>,
    pub(crate) metadata: ContainerMetadata,
    pub(crate) team_id: Uuid,
    pub(crate) build_id: Uuid,
    pub(crate) backend: Arc<dyn ResourceBackend>,
}

impl FetchAction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Whether this fetch defers its version to an earlier publish
    pub fn defers_to_publish(&self) -> bool {
        matches!(self.version_source, VersionSource::FromPublish(_))
    }
}

#[async_trait]
impl Action for FetchAction {
    fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    async fn execute(&self, _ctx: &ExecContext) -> Result<()> {
        debug!(
            "Fetching resource '{}' for build {} (team {})",
            self.resource, self.build_id, self.team_id
        );

        let source = self.source.evaluate().await?;
        let params = self.params.evaluate().await?;

        let version = self
            .version_source
            .resolve(self.backend.as_ref(), &self.resource_type, &source)
            .await?;

        let fetched = self
            .backend
            .fetch(FetchRequest {
                resource: self.resource.clone(),
                resource_type: self.resource_type.clone(),
                source,
                params,
                version,
                tags: self.tags.clone(),
                metadata: self.metadata.clone(),
            })
            .await?;

        info!("Fetch '{}' pulled version {:?}", self.name, fetched);
        Ok(())
    }
}
