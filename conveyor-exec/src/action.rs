//! Actions and steps
//!
//! An [`Action`] is the resolved, execution-ready behavior for one plan
//! node with all external dependencies bound at construction. A step
//! ([`ActionsStep`]) sequences its actions in order and reports their
//! lifecycle through the caller's events delegate. Steps retain no plan
//! data, only the actions they were given.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use conveyor_core::event::{StepEvent, StepEventKind};
use conveyor_core::plan::PlanId;

use crate::error::{ExecError, Result};
use crate::worker::ContainerFs;

/// Everything an action needs at execution time that is not bound at
/// construction: the cancellation signal and the container filesystem
/// view
#[derive(Clone)]
pub struct ExecContext {
    pub cancel: CancellationToken,
    pub fs: Arc<dyn ContainerFs>,
}

impl ExecContext {
    pub fn new(cancel: CancellationToken, fs: Arc<dyn ContainerFs>) -> Self {
        Self { cancel, fs }
    }
}

/// Sink for step lifecycle events
///
/// Push-only; implementations must not block the step.
pub trait BuildEventDelegate: Send + Sync {
    fn on_event(&self, event: StepEvent);
}

/// Resolved, execution-ready behavior for one plan node
///
/// Construction binds an immutable snapshot of the node's resolved
/// source and params; execution performs all I/O.
#[async_trait]
pub trait Action: Send + Sync {
    fn plan_id(&self) -> &PlanId;

    async fn execute(&self, ctx: &ExecContext) -> Result<()>;
}

/// A runnable step: one or more actions plus an events delegate
pub struct ActionsStep {
    actions: Vec<Arc<dyn Action>>,
    events: Arc<dyn BuildEventDelegate>,
}

impl std::fmt::Debug for ActionsStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan_ids: Vec<&PlanId> = self.actions.iter().map(|action| action.plan_id()).collect();
        f.debug_struct("ActionsStep")
            .field("actions", &plan_ids)
            .finish()
    }
}

impl ActionsStep {
    pub fn new(actions: Vec<Arc<dyn Action>>, events: Arc<dyn BuildEventDelegate>) -> Self {
        Self { actions, events }
    }

    /// Runs the step's actions in order, stopping at the first failure
    ///
    /// Every outcome, including cancellation, is reported through the
    /// delegate before the error propagates; nothing fails silently.
    pub async fn execute(&self, ctx: &ExecContext) -> Result<()> {
        for action in &self.actions {
            let plan_id = action.plan_id().clone();
            debug!("Executing action for plan {}", plan_id);
            self.events
                .on_event(StepEvent::now(plan_id.clone(), StepEventKind::Started));

            let result = tokio::select! {
                _ = ctx.cancel.cancelled() => Err(ExecError::Aborted),
                result = action.execute(ctx) => result,
            };

            match result {
                Ok(()) => {
                    info!("Action for plan {} succeeded", plan_id);
                    self.events
                        .on_event(StepEvent::now(plan_id, StepEventKind::Succeeded));
                }
                Err(ExecError::Aborted) => {
                    warn!("Action for plan {} aborted", plan_id);
                    self.events
                        .on_event(StepEvent::now(plan_id, StepEventKind::Aborted));
                    return Err(ExecError::Aborted);
                }
                Err(error) => {
                    warn!("Action for plan {} failed: {}", plan_id, error);
                    self.events.on_event(StepEvent::now(
                        plan_id,
                        StepEventKind::Failed {
                            message: error.to_string(),
                        },
                    ));
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
