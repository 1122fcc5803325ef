//! Step factory
//!
//! Turns one plan node plus build context into a runnable step, binding
//! credentials, configuration sources, working directories, and the
//! cross-step linkage registry. Construction is pure: no I/O happens
//! until the returned step executes.
//!
//! One factory instance serves one plan-translation pass. Constructors
//! may be called concurrently across the plan's nodes; the plan tree's
//! dependency order guarantees that a publish node is constructed
//! before any fetch that depends on it.

use std::sync::{Arc, OnceLock};
use tracing::debug;

use conveyor_core::build::{BuildContext, ContainerMetadata};
use conveyor_core::plan::{Plan, PlanStep};

use crate::action::{Action, ActionsStep, BuildEventDelegate};
use crate::configsource::{
    DeprecationConfigSource, FileConfigSource, MergedConfigSource, MissingConfigSource,
    StaticConfigSource, TaskConfigSource, ValidatingConfigSource,
};
use crate::creds::{CredParams, CredSource, VariablesFactory};
use crate::error::{ExecError, Result};
use crate::fetch::{FetchAction, VersionSource};
use crate::publish::PublishAction;
use crate::registry::PublishRegistry;
use crate::task::TaskAction;
use crate::worker::{ResourceBackend, WorkerPool};
use crate::workdir::WorkdirAllocator;

/// Builds runnable steps from plan nodes
///
/// Scope one instance to one plan-translation pass; the linkage
/// registry it owns must never outlive the build it was created for.
pub struct StepFactory {
    worker_pool: Arc<dyn WorkerPool>,
    resource_backend: Arc<dyn ResourceBackend>,
    variables_factory: VariablesFactory,
    workdir: WorkdirAllocator,
    publish_actions: PublishRegistry,
}

impl StepFactory {
    pub fn new(
        worker_pool: Arc<dyn WorkerPool>,
        resource_backend: Arc<dyn ResourceBackend>,
        variables_factory: VariablesFactory,
        workdir: WorkdirAllocator,
    ) -> Self {
        Self {
            worker_pool,
            resource_backend,
            variables_factory,
            workdir,
            publish_actions: PublishRegistry::new(),
        }
    }

    /// Constructs a fetch step from a get plan node
    pub fn get(
        &self,
        plan: &Plan,
        build: &BuildContext,
        metadata: ContainerMetadata,
        events: Arc<dyn BuildEventDelegate>,
    ) -> Result<ActionsStep> {
        let action = self.fetch_action(plan, build, metadata)?;
        let actions: Vec<Arc<dyn Action>> = vec![action];
        Ok(ActionsStep::new(actions, events))
    }

    /// Constructs a publish step from a put plan node
    ///
    /// Registers the publish action in the linkage registry before
    /// returning, unconditionally: the registry records intent to
    /// produce, not a produced value.
    pub fn put(
        &self,
        plan: &Plan,
        build: &BuildContext,
        metadata: ContainerMetadata,
        events: Arc<dyn BuildEventDelegate>,
    ) -> Result<ActionsStep> {
        let action = self.publish_action(plan, build, metadata)?;
        let actions: Vec<Arc<dyn Action>> = vec![action];
        Ok(ActionsStep::new(actions, events))
    }

    /// Constructs a run step from a task plan node
    ///
    /// A node with neither an inline config nor a config path still
    /// constructs; its config source fails when resolution is attempted.
    pub fn task(
        &self,
        plan: &Plan,
        build: &BuildContext,
        metadata: ContainerMetadata,
        events: Arc<dyn BuildEventDelegate>,
    ) -> Result<ActionsStep> {
        let action = self.task_action(plan, build, metadata, events.clone())?;
        let actions: Vec<Arc<dyn Action>> = vec![action];
        Ok(ActionsStep::new(actions, events))
    }

    fn fetch_action(
        &self,
        plan: &Plan,
        build: &BuildContext,
        mut metadata: ContainerMetadata,
    ) -> Result<Arc<FetchAction>> {
        let PlanStep::Get(get) = &plan.step else {
            return Err(malformed(plan, "expected a get step"));
        };

        metadata.working_directory = self.workdir.resources_dir("get").display().to_string();

        let variables = self
            .variables_factory
            .scoped(&build.team_name, &build.pipeline_name);

        debug!("Constructing fetch step '{}' for plan {}", get.name, plan.id);

        Ok(Arc::new(FetchAction {
            plan_id: plan.id.clone(),
            name: get.name.clone(),
            resource: get.resource.clone(),
            resource_type: get.resource_type.clone(),
            source: CredSource::new(variables.clone(), get.source.clone()),
            params: CredParams::new(variables, get.params.clone()),
            version_source: VersionSource::from_plan(&plan.id, get, &self.publish_actions),
            tags: get.tags.clone(),
            outputs: vec![get.name.clone()],
            metadata,
            team_id: build.team_id,
            build_id: build.build_id,
            backend: self.resource_backend.clone(),
        }))
    }

    fn publish_action(
        &self,
        plan: &Plan,
        build: &BuildContext,
        mut metadata: ContainerMetadata,
    ) -> Result<Arc<PublishAction>> {
        let PlanStep::Put(put) = &plan.step else {
            return Err(malformed(plan, "expected a put step"));
        };

        metadata.working_directory = self.workdir.resources_dir("put").display().to_string();

        let variables = self
            .variables_factory
            .scoped(&build.team_name, &build.pipeline_name);

        debug!(
            "Constructing publish step '{}' for plan {}",
            put.name, plan.id
        );

        let action = Arc::new(PublishAction {
            plan_id: plan.id.clone(),
            name: put.name.clone(),
            resource: put.resource.clone(),
            resource_type: put.resource_type.clone(),
            source: CredSource::new(variables.clone(), put.source.clone()),
            params: CredParams::new(variables, put.params.clone()),
            tags: put.tags.clone(),
            metadata,
            team_id: build.team_id,
            build_id: build.build_id,
            backend: self.resource_backend.clone(),
            produced: OnceLock::new(),
        });

        self.publish_actions.register(plan.id.clone(), action.clone());

        Ok(action)
    }

    fn task_action(
        &self,
        plan: &Plan,
        build: &BuildContext,
        mut metadata: ContainerMetadata,
        events: Arc<dyn BuildEventDelegate>,
    ) -> Result<Arc<TaskAction>> {
        let PlanStep::Task(task) = &plan.step else {
            return Err(malformed(plan, "expected a task step"));
        };

        let working_directory = self.workdir.task_dir(&task.name).display().to_string();
        metadata.working_directory = working_directory.clone();

        let has_inline = task.config.is_some() || !task.params.is_empty();
        let config_source: Box<dyn TaskConfigSource> = match (&task.config_path, has_inline) {
            (Some(path), true) => Box::new(MergedConfigSource::new(
                Box::new(FileConfigSource::new(path.clone())),
                Box::new(StaticConfigSource::new(
                    task.config.clone(),
                    task.params.clone(),
                )),
            )),
            (None, true) => Box::new(StaticConfigSource::new(
                task.config.clone(),
                task.params.clone(),
            )),
            (Some(path), false) => Box::new(FileConfigSource::new(path.clone())),
            (None, false) => Box::new(MissingConfigSource),
        };

        let config_source = Box::new(ValidatingConfigSource::new(config_source));
        let config_source = Box::new(DeprecationConfigSource::new(
            config_source,
            plan.id.clone(),
            events,
        ));

        let variables = self
            .variables_factory
            .scoped(&build.team_name, &build.pipeline_name);

        debug!(
            "Constructing task step '{}' for plan {} (workdir {})",
            task.name, plan.id, working_directory
        );

        Ok(Arc::new(TaskAction {
            plan_id: plan.id.clone(),
            step_name: task.name.clone(),
            privileged: task.privileged,
            config_source,
            tags: task.tags.clone(),
            input_mapping: task.input_mapping.clone(),
            output_mapping: task.output_mapping.clone(),
            working_directory,
            image_artifact_name: task.image_artifact_name.clone(),
            metadata,
            team_id: build.team_id,
            build_id: build.build_id,
            job_id: build.job_id,
            variables,
            worker_pool: self.worker_pool.clone(),
        }))
    }

    /// The linkage registry for this translation pass
    pub fn registry(&self) -> &PublishRegistry {
        &self.publish_actions
    }
}

fn malformed(plan: &Plan, reason: &str) -> ExecError {
    ExecError::MalformedPlan {
        plan_id: plan.id.to_string(),
        reason: reason.to_string(),
    }
}
