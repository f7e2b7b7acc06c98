use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::{AgentDirectory, AgentProxy};
use crate::error::{FleetError, Result};

/// Directory over a fixed set of registered proxies
#[derive(Default)]
pub struct StaticAgentDirectory {
    proxies: DashMap<String, Arc<dyn AgentProxy>>,
}

impl StaticAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent_id: impl Into<String>, proxy: Arc<dyn AgentProxy>) {
        let agent_id = agent_id.into();
        debug!("Registered proxy for agent {}", agent_id);
        self.proxies.insert(agent_id, proxy);
    }

    pub fn unregister(&self, agent_id: &str) -> bool {
        self.proxies.remove(agent_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[async_trait]
impl AgentDirectory for StaticAgentDirectory {
    async fn with_agent_id(
        &self,
        agent_id: &str,
        instance_name: &str,
    ) -> Result<Arc<dyn AgentProxy>> {
        self.proxies
            .get(agent_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| FleetError::AgentNotFound {
                agent_id: agent_id.to_string(),
                instance: instance_name.to_string(),
            })
    }
}
