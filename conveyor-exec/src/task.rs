//! Task ("run") action
//!
//! Executes a command in a container placed by the worker pool. The
//! effective configuration is resolved through the config-source chain
//! at execution time, then secrets in its params are substituted, and
//! the fully resolved spec is handed to the worker pool.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use conveyor_core::build::ContainerMetadata;
use conveyor_core::plan::PlanId;

use crate::action::{Action, ExecContext};
use crate::configsource::TaskConfigSource;
use crate::creds::{CredParams, Variables};
use crate::error::{ExecError, Result};
use crate::worker::{TaskSpec, WorkerPool};

/// Execution-ready task behavior for one plan node
pub struct TaskAction {
    pub(crate) plan_id: PlanId,
    pub(crate) step_name: String,
    pub(crate) privileged: bool,
    pub(crate) config_source: Box<dyn TaskConfigSource>,
    pub(crate) tags: Vec<String>,
    pub(crate) input_mapping: BTreeMap<String, String>,
    pub(crate) output_mapping: BTreeMap<String, String>,
    pub(crate) working_directory: String,
    pub(crate) image_artifact_name: Option<String>,
    pub(crate) metadata: ContainerMetadata,
    pub(crate) team_id: Uuid,
    pub(crate) build_id: Uuid,
    pub(crate) job_id: Option<Uuid>,
    pub(crate) variables: Variables,
    pub(crate) worker_pool: Arc<dyn WorkerPool>,
}

impl TaskAction {
    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }
}

#[async_trait]
impl Action for TaskAction {
    fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    async fn execute(&self, ctx: &ExecContext) -> Result<()> {
        debug!(
            "Resolving task config for step '{}' (build {})",
            self.step_name, self.build_id
        );

        let raw = self.config_source.fetch_config(ctx.fs.as_ref()).await?;
        let mut config = raw.into_config()?;
        config.privileged = config.privileged || self.privileged;

        // Task params may embed secret references too
        config.params = CredParams::new(self.variables.clone(), config.params.clone())
            .evaluate()
            .await?;

        let outcome = self
            .worker_pool
            .run_task(TaskSpec {
                plan_id: self.plan_id.clone(),
                step_name: self.step_name.clone(),
                team_id: self.team_id,
                build_id: self.build_id,
                job_id: self.job_id,
                privileged: config.privileged,
                config,
                working_directory: self.working_directory.clone(),
                image_artifact_name: self.image_artifact_name.clone(),
                input_mapping: self.input_mapping.clone(),
                output_mapping: self.output_mapping.clone(),
                tags: self.tags.clone(),
                metadata: self.metadata.clone(),
            })
            .await?;

        info!(
            "Task '{}' exited with status {}",
            self.step_name, outcome.exit_code
        );

        if outcome.exit_code != 0 {
            return Err(ExecError::TaskFailed {
                exit_code: outcome.exit_code,
            });
        }
        Ok(())
    }
}
