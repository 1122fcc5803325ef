//! Publish ("put") action
//!
//! Pushes build output to a resource, producing a concrete version.
//! The produced version is recorded on the action itself so that a
//! later fetch in the same translation pass can consume it through the
//! linkage registry instead of issuing its own version check.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use uuid::Uuid;

use conveyor_core::build::{ContainerMetadata, Version};
use conveyor_core::plan::PlanId;

use crate::action::{Action, ExecContext};
use crate::creds::{CredParams, CredSource};
use crate::error::Result;
use crate::worker::{PublishRequest, ResourceBackend};

/// Execution-ready publish behavior for one plan node
pub struct PublishAction {
    pub(crate) plan_id: PlanId,
    pub(crate) name: String,
    pub(crate) resource: String,
    pub(crate) resource_type: String,
    pub(crate) source: CredSource,
    pub(crate) params: CredParams,
    pub(crate) tags: Vec<String>,
    pub(crate) metadata: ContainerMetadata,
    pub(crate) team_id: Uuid,
    pub(crate) build_id: Uuid,
    pub(crate) backend: Arc<dyn ResourceBackend>,
    pub(crate) produced: OnceLock<Version>,
}

impl PublishAction {
    /// The version this publish produced, once it has executed
    pub fn produced_version(&self) -> Option<Version> {
        self.produced.get().cloned()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Action for PublishAction {
    fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    async fn execute(&self, _ctx: &ExecContext) -> Result<()> {
        debug!(
            "Publishing resource '{}' for build {} (team {})",
            self.resource, self.build_id, self.team_id
        );

        let source = self.source.evaluate().await?;
        let params = self.params.evaluate().await?;

        let version = self
            .backend
            .publish(PublishRequest {
                resource: self.resource.clone(),
                resource_type: self.resource_type.clone(),
                source,
                params,
                tags: self.tags.clone(),
                metadata: self.metadata.clone(),
            })
            .await?;

        info!("Publish '{}' produced version {:?}", self.name, version);
        // First write wins; a publish action executes at most once
        let _ = self.produced.set(version);

        Ok(())
    }
}
