use crate::types::{CapabilityResult, CapabilityTask, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An information-gathering capability that tasks can be routed to by name.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, task: &CapabilityTask) -> Result<CapabilityResult>;
}

/// Name and description of a registered capability, as shown to the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
}

#[derive(Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    /// Run a task. Unknown names and capability errors become failure results.
    pub async fn execute(&self, task: &CapabilityTask) -> CapabilityResult {
        let Some(capability) = self.capabilities.get(&task.capability) else {
            return CapabilityResult::failure(format!(
                "Capability not found: {}",
                task.capability
            ));
        };

        match capability.execute(task).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(capability = %task.capability, "Capability failed: {}", e);
                CapabilityResult::failure(format!(
                    "Error executing {} for gap '{}': {}",
                    task.capability,
                    task.gap.as_deref().unwrap_or(""),
                    e
                ))
            }
        }
    }

    /// Registered capabilities sorted by name.
    pub fn infos(&self) -> Vec<CapabilityInfo> {
        let mut infos: Vec<CapabilityInfo> = self
            .capabilities
            .values()
            .map(|c| CapabilityInfo {
                name: c.name().to_string(),
                description: c.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get a list of all registered capability names
    pub fn capability_names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    /// Check if a capability is registered
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
