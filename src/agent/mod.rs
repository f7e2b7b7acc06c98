//! Agent proxies
//!
//! Every managed VM runs an agent. The transport that reaches it lives
//! elsewhere; the broadcaster only sees it through these traits:
//! - `AgentProxy` is the per-agent call handle
//! - `AgentDirectory` resolves an agent identity to its proxy

pub mod directory;

pub use directory::StaticAgentDirectory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::RequestId;
use crate::error::Result;

/// Invoked at most once with the agent's reply body
pub type SyncDnsCallback = Box<dyn FnOnce(serde_json::Value) + Send + 'static>;

/// Call handle for one agent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentProxy: Send + Sync {
    /// Fire-and-forget: drop ARP cache entries for the given addresses
    async fn delete_arp_entries(&self, ip_addresses: &[String]) -> Result<()>;

    /// Send a DNS sync request.
    ///
    /// Returns as soon as the request is on its way. `on_complete` runs later,
    /// if and when the agent replies.
    async fn sync_dns(
        &self,
        blob_id: &str,
        checksum: &str,
        version: i64,
        on_complete: SyncDnsCallback,
    ) -> Result<RequestId>;

    /// Fire-and-forget: abandon a previously sent sync_dns request
    async fn cancel_sync_dns(&self, request_id: &RequestId) -> Result<()>;
}

/// Lookup of agent proxies by agent identity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn with_agent_id(&self, agent_id: &str, instance_name: &str)
        -> Result<Arc<dyn AgentProxy>>;
}
