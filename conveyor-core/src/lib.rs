//! Conveyor Core
//!
//! Shared types for the Conveyor CI/CD execution engine.
//!
//! This crate contains:
//! - Plan types: the parsed build plan tree handed to the execution core
//! - Build types: build/team/pipeline identity and container metadata
//! - Config types: task configuration and its merge/validate rules
//! - Event types: lifecycle events streamed to the caller's delegate
//!
//! Note: translation and execution logic lives in conveyor-exec.

pub mod build;
pub mod config;
pub mod event;
pub mod plan;
