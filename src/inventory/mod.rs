//! Instance Inventory and Target Selection
//!
//! The inventory itself belongs to another subsystem; this module only reads
//! it and narrows it down to the instances an agent broadcast may target.

pub mod selector;

pub use selector::{filter_instances, InstanceSelector};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ManagedInstance;
use crate::error::Result;

/// Read access to the instance inventory
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// All known instances in stable enumeration order
    async fn instances(&self) -> Result<Vec<ManagedInstance>>;
}

/// Inventory held in memory, enumerated in insertion order
#[derive(Default)]
pub struct InMemoryInventory {
    instances: RwLock<Vec<ManagedInstance>>,
}

impl InMemoryInventory {
    pub fn new(instances: Vec<ManagedInstance>) -> Self {
        Self {
            instances: RwLock::new(instances),
        }
    }

    pub async fn add(&self, instance: ManagedInstance) {
        self.instances.write().await.push(instance);
    }

    /// Replace the instance with the same uuid, or append it
    pub async fn upsert(&self, instance: ManagedInstance) {
        let mut instances = self.instances.write().await;
        match instances.iter_mut().find(|i| i.uuid == instance.uuid) {
            Some(existing) => *existing = instance,
            None => instances.push(instance),
        }
    }

    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }
}

#[async_trait]
impl InstanceDirectory for InMemoryInventory {
    async fn instances(&self) -> Result<Vec<ManagedInstance>> {
        Ok(self.instances.read().await.clone())
    }
}
