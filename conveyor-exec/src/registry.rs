//! Cross-step linkage registry
//!
//! Remembers every publish action constructed during one translation
//! pass, keyed by plan-node ID, so a later fetch for the same ID can
//! defer to the publish's eventual result instead of issuing an
//! independent version check. Registration records intent to produce;
//! the consumer reads the actual version lazily at execution time.
//!
//! One registry per factory instance; it is discarded with the factory
//! and never shared across builds.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use conveyor_core::plan::PlanId;

use crate::publish::PublishAction;

/// Plan-ID-keyed record of publish actions for one translation pass
///
/// Safe for concurrent translation calls: many readers, occasional
/// writers.
pub struct PublishRegistry {
    entries: RwLock<HashMap<PlanId, Arc<PublishAction>>>,
}

impl PublishRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Records a publish action under its plan-node ID
    ///
    /// Re-registration under the same ID overwrites; well-formed plans
    /// never do this.
    pub fn register(&self, plan_id: PlanId, action: Arc<PublishAction>) {
        self.entries.write().unwrap().insert(plan_id, action);
    }

    /// Exact-match lookup; no fallback search
    pub fn lookup(&self, plan_id: &PlanId) -> Option<Arc<PublishAction>> {
        self.entries.read().unwrap().get(plan_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PublishRegistry {
    fn default() -> Self {
        Self::new()
    }
}
