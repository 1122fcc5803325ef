//! Conveyor Exec
//!
//! The execution core of the Conveyor CI/CD engine: turns declarative
//! build-plan nodes into runnable steps bound to a specific build,
//! team, and set of resolved secrets.
//!
//! Architecture:
//! - Factory: one construction operation per plan-node kind (get/put/task)
//! - Actions: execution-ready behavior with all dependencies bound
//! - Config sources: layered resolution of the effective task config
//! - Credentials: lazy `((secret))` substitution scoped per team/pipeline
//! - Registry: same-pass linkage from a put's result to a later get
//!
//! Construction is pure; all I/O happens inside action execution,
//! against collaborator traits supplied by the caller.

pub mod action;
pub mod configsource;
pub mod creds;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod publish;
pub mod registry;
pub mod task;
pub mod workdir;
pub mod worker;

#[cfg(test)]
pub(crate) mod fakes;

pub use action::{Action, ActionsStep, BuildEventDelegate, ExecContext};
pub use creds::{CredParams, CredSource, SecretStore, Variables, VariablesFactory};
pub use error::{ExecError, Result};
pub use factory::StepFactory;
pub use registry::PublishRegistry;
pub use workdir::WorkdirAllocator;
pub use worker::{ContainerFs, ResourceBackend, WorkerPool};
