//! # Status Checking
//!
//! Predicates deciding whether a provisioned resource's side of a transfer
//! has completed. Checkers register per resource kind; a missing checker is
//! meaningful to the scheduler (wait for managed resources, treat as done
//! for unmanaged ones), so `resolve` returns an `Option`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{ProvisionedResource, TransferProcess};

pub trait StatusChecker: Send + Sync {
    fn is_complete(&self, process: &TransferProcess, resource: &ProvisionedResource) -> bool;
}

#[derive(Default)]
pub struct StatusCheckerRegistry {
    checkers: HashMap<String, Arc<dyn StatusChecker>>,
}

impl StatusCheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource_kind: impl Into<String>, checker: Arc<dyn StatusChecker>) {
        self.checkers.insert(resource_kind.into(), checker);
    }

    pub fn resolve(&self, resource_kind: &str) -> Option<Arc<dyn StatusChecker>> {
        self.checkers.get(resource_kind).cloned()
    }
}
