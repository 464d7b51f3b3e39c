//! Startup-time module registry
//!
//! Modules are registered once, in order, before the engine starts. The
//! registration index is the final tie-breaker during selection.

use crate::EngineError;
use groundtruth_domain::{RateBudget, SourceModule, Tier};
use serde::Serialize;
use std::sync::Arc;

/// Summary of a registered module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    /// Registration index
    pub index: usize,
    /// Module name
    pub name: String,
    /// Authority tier
    pub tier: Tier,
    /// Origin whose rate budget the module consumes
    pub origin: String,
    /// Effective rate budget
    pub rate_budget: RateBudget,
    /// Cache class
    pub cache_class: String,
}

/// Ordered list of source modules
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn SourceModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; names must be unique
    pub fn register(&mut self, module: Arc<dyn SourceModule>) -> Result<usize, EngineError> {
        if module.name().trim().is_empty() {
            return Err(EngineError::Registration("module name is empty".to_string()));
        }
        if self.modules.iter().any(|m| m.name() == module.name()) {
            return Err(EngineError::Registration(format!(
                "module '{}' is already registered",
                module.name()
            )));
        }
        let index = self.modules.len();
        tracing::debug!(module = module.name(), tier = %module.tier(), index, "Module registered");
        self.modules.push(module);
        Ok(index)
    }

    /// Modules in registration order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<dyn SourceModule>)> {
        self.modules.iter().enumerate()
    }

    /// Modules at one tier, in registration order
    pub fn at_tier(&self, tier: Tier) -> impl Iterator<Item = (usize, &Arc<dyn SourceModule>)> {
        self.iter().filter(move |(_, m)| m.tier() == tier)
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
