//! Step lifecycle events
//!
//! Events a running step pushes to the caller's delegate. Push-only;
//! the delegate must not block the step.

use serde::{Deserialize, Serialize};

use crate::plan::PlanId;

/// One lifecycle event from a running step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub plan_id: PlanId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub kind: StepEventKind,
}

impl StepEvent {
    pub fn now(plan_id: PlanId, kind: StepEventKind) -> Self {
        Self {
            plan_id,
            timestamp: chrono::Utc::now(),
            kind,
        }
    }
}

/// What happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepEventKind {
    Started,
    Succeeded,
    Failed { message: String },
    Aborted,
    /// Non-fatal diagnostic, e.g. a deprecation notice
    Warning { message: String },
}

impl StepEventKind {
    /// Whether this event ends the step
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepEventKind::Succeeded | StepEventKind::Failed { .. } | StepEventKind::Aborted
        )
    }
}
