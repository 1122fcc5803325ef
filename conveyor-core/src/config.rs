//! Task configuration
//!
//! The effective configuration of a run step: what command to run, in
//! which image, with which inputs and outputs. Configs arrive either
//! inline in the plan or from a file inside a fetched resource, and the
//! two layers merge with inline winning per field.
//!
//! The merge/validate/rewrite primitives here are pure; reading config
//! files and composing sources happens in conveyor-exec.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Problems found while validating or normalizing a task configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required fields are absent or structurally malformed
    #[error("invalid task config: {0}")]
    Invalid(String),

    /// The config parsed but declares no command to run
    #[error("invalid task config: missing run command")]
    MissingRunCommand,

    /// The config file did not parse
    #[error("failed to parse task config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Command a task runs inside its container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub path: String,
    pub args: Vec<String>,
    pub dir: Option<String>,
}

/// A named artifact the task consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// A named artifact the task produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Fully resolved, validated task configuration
///
/// Produced once per task action by the config-source chain; never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub platform: String,
    pub image: Option<String>,
    pub run: RunConfig,
    pub inputs: Vec<TaskInput>,
    pub outputs: Vec<TaskOutput>,
    pub params: BTreeMap<String, serde_json::Value>,
    pub privileged: bool,
}

/// Task configuration as written, before validation and deprecation
/// rewriting
///
/// Keeps the obsolete top-level `path`/`args` spellings so the
/// deprecation shim can detect and rewrite them. Every field is
/// optional at this stage; [`RawTaskConfig::into_config`] enforces the
/// required ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTaskConfig {
    pub platform: String,
    pub image: Option<String>,
    pub run: Option<RunConfig>,
    /// Obsolete spelling of `run.path`
    pub path: Option<String>,
    /// Obsolete spelling of `run.args`
    pub args: Option<Vec<String>>,
    pub inputs: Vec<TaskInput>,
    pub outputs: Vec<TaskOutput>,
    pub params: BTreeMap<String, serde_json::Value>,
    pub privileged: bool,
}

impl RawTaskConfig {
    /// Parses a config file's contents
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Merges an inline config over a file config
    ///
    /// The inline layer wins on any field it declares; fields it leaves
    /// empty keep the file layer's value. Returns a new config, leaving
    /// both layers untouched.
    pub fn merge(file: &RawTaskConfig, inline: &RawTaskConfig) -> RawTaskConfig {
        let mut merged = file.clone();

        if !inline.platform.is_empty() {
            merged.platform = inline.platform.clone();
        }
        if inline.image.is_some() {
            merged.image = inline.image.clone();
        }
        if inline.run.is_some() {
            merged.run = inline.run.clone();
        }
        if inline.path.is_some() {
            merged.path = inline.path.clone();
        }
        if inline.args.is_some() {
            merged.args = inline.args.clone();
        }
        if !inline.inputs.is_empty() {
            merged.inputs = inline.inputs.clone();
        }
        if !inline.outputs.is_empty() {
            merged.outputs = inline.outputs.clone();
        }
        for (name, value) in &inline.params {
            merged.params.insert(name.clone(), value.clone());
        }
        merged.privileged = file.privileged || inline.privileged;

        merged
    }

    /// Checks required fields and input/output structure
    ///
    /// Accepts either the current `run` form or the obsolete top-level
    /// `path`, since validation runs before the deprecation rewrite.
    /// All problems are reported in one error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let has_run = self
            .run
            .as_ref()
            .map(|run| !run.path.is_empty())
            .unwrap_or(false);
        let has_legacy_run = self
            .path
            .as_ref()
            .map(|path| !path.is_empty())
            .unwrap_or(false);
        if !has_run && !has_legacy_run {
            problems.push("missing 'run.path' (command to run)".to_string());
        }

        for (idx, input) in self.inputs.iter().enumerate() {
            if input.name.is_empty() {
                problems.push(format!("input {} has no name", idx));
            }
        }
        for (idx, output) in self.outputs.iter().enumerate() {
            if output.name.is_empty() {
                problems.push(format!("output {} has no name", idx));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }

    /// Rewrites obsolete field spellings into their current form
    ///
    /// Returns one warning line per rewritten field. Leaves every other
    /// field untouched and never fails.
    pub fn rewrite_deprecated_fields(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(path) = self.path.take() {
            let run = self.run.get_or_insert_with(RunConfig::default);
            if run.path.is_empty() {
                run.path = path;
            }
            warnings.push(
                "DEPRECATION WARNING: top-level 'path' is deprecated, use 'run.path'".to_string(),
            );
        }
        if let Some(args) = self.args.take() {
            let run = self.run.get_or_insert_with(RunConfig::default);
            if run.args.is_empty() {
                run.args = args;
            }
            warnings.push(
                "DEPRECATION WARNING: top-level 'args' is deprecated, use 'run.args'".to_string(),
            );
        }

        warnings
    }

    /// Converts into the final configuration
    ///
    /// Expects validation and deprecation rewriting to have happened;
    /// a still-missing run command is an error, not a panic.
    pub fn into_config(self) -> Result<TaskConfig, ConfigError> {
        let run = self.run.ok_or(ConfigError::MissingRunCommand)?;
        if run.path.is_empty() {
            return Err(ConfigError::MissingRunCommand);
        }

        Ok(TaskConfig {
            platform: self.platform,
            image: self.image,
            run,
            inputs: self.inputs,
            outputs: self.outputs,
            params: self.params,
            privileged: self.privileged,
        })
    }
}

impl From<TaskConfig> for RawTaskConfig {
    fn from(config: TaskConfig) -> Self {
        RawTaskConfig {
            platform: config.platform,
            image: config.image,
            run: Some(config.run),
            path: None,
            args: None,
            inputs: config.inputs,
            outputs: config.outputs,
            params: config.params,
            privileged: config.privileged,
        }
    }
}
