//! Working-directory allocation
//!
//! Every step gets a working directory under one build-scratch root.
//! Get and put steps use a fixed per-kind subdirectory; task steps get
//! a directory derived from their artifact name so that any code that
//! knows the name can predict the path. The name is hashed so arbitrary
//! artifact names never produce illegal path characters.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Digest prefix length, in bytes, used for task directory names
const DIR_DIGEST_BYTES: usize = 4;

/// Derives step working directories under one scratch root
///
/// The root is explicit configuration so tests can isolate it.
#[derive(Debug, Clone)]
pub struct WorkdirAllocator {
    scratch_root: PathBuf,
}

impl WorkdirAllocator {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
        }
    }

    /// Working directory for get/put steps of the given kind
    pub fn resources_dir(&self, kind: &str) -> PathBuf {
        self.scratch_root.join(kind)
    }

    /// Working directory for a task, keyed on its artifact name
    ///
    /// Deterministic: the same name always yields the same path.
    pub fn task_dir(&self, artifact_name: &str) -> PathBuf {
        let digest = Sha256::digest(artifact_name.as_bytes());
        let mut prefix = String::with_capacity(DIR_DIGEST_BYTES * 2);
        for byte in &digest[..DIR_DIGEST_BYTES] {
            prefix.push_str(&format!("{:02x}", byte));
        }
        self.scratch_root.join(prefix)
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }
}
