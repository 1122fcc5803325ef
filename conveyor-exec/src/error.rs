//! Error types for the execution core
//!
//! Terminal errors all surface through the step's events delegate as a
//! failure; nothing is retried here. Retry policy belongs to the
//! caller's scheduler.

use thiserror::Error;

use conveyor_core::config::ConfigError;

use crate::worker::{ResourceError, WorkerError};

/// Result type alias for execution-core operations
pub type Result<T> = std::result::Result<T, ExecError>;

/// Errors that can occur while constructing or executing a step
#[derive(Debug, Error)]
pub enum ExecError {
    /// The plan node handed to a constructor does not declare the step
    /// kind that constructor builds
    #[error("malformed plan node {plan_id}: {reason}")]
    MalformedPlan { plan_id: String, reason: String },

    /// A task declared neither an inline config nor a config path
    #[error("missing task config: no config or config path declared")]
    MissingTaskConfig,

    /// The resolved task config failed validation or did not parse
    #[error(transparent)]
    InvalidTaskConfig(#[from] ConfigError),

    /// The task's config file could not be read from the container
    #[error("failed to read task config file {path}: {message}")]
    ConfigFileUnreadable { path: String, message: String },

    /// A secret reference could not be resolved
    ///
    /// Carries only the reference, never the value.
    #[error("credential resolution error for reference (({reference})): {cause}")]
    CredentialResolution { reference: String, cause: String },

    /// A fetch deferred to a publish that has not produced a version
    #[error("publish step for plan {plan_id} produced no version")]
    PublishProducedNoVersion { plan_id: String },

    /// The resource backend failed; opaque to this core
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The worker pool failed; opaque to this core
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The task ran and exited nonzero
    #[error("task exited with status {exit_code}")]
    TaskFailed { exit_code: i32 },

    /// Execution was cancelled from outside
    #[error("step aborted")]
    Aborted,
}

impl ExecError {
    /// Whether this error came from a caller-supplied collaborator
    /// rather than from this core's own resolution logic
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Resource(_) | Self::Worker(_))
    }

    /// Whether this error is the result of cancellation
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
