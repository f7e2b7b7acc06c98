use serde::{Deserialize, Serialize};

/// Opaque identifier an agent proxy assigns to an in-flight request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Outcome of one broadcast request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Pending,
    Success,
    Failed,
    Unresponsive,
}

impl RequestOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestOutcome::Pending)
    }
}

impl std::fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestOutcome::Pending => write!(f, "pending"),
            RequestOutcome::Success => write!(f, "success"),
            RequestOutcome::Failed => write!(f, "failed"),
            RequestOutcome::Unresponsive => write!(f, "unresponsive"),
        }
    }
}

/// One dispatched request of a deadline broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub request_id: RequestId,
    pub agent_id: String,
    pub instance_name: String,
    pub outcome: RequestOutcome,
}

impl BroadcastRequest {
    pub fn pending(request_id: RequestId, agent_id: &str, instance_name: &str) -> Self {
        Self {
            request_id,
            agent_id: agent_id.to_string(),
            instance_name: instance_name.to_string(),
            outcome: RequestOutcome::Pending,
        }
    }
}

/// Payload of a DNS sync broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDnsPayload {
    pub blob_id: String,
    pub checksum: String,
    pub version: i64,
}

impl SyncDnsPayload {
    pub fn new(blob_id: impl Into<String>, checksum: impl Into<String>, version: i64) -> Self {
        Self {
            blob_id: blob_id.into(),
            checksum: checksum.into(),
            version,
        }
    }

    /// Reject payloads that can't be sent
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::FleetError;

        if self.blob_id.trim().is_empty() {
            return Err(FleetError::InvalidInput("blob_id is empty".to_string()));
        }
        if self.checksum.trim().is_empty() {
            return Err(FleetError::InvalidInput("checksum is empty".to_string()));
        }
        if self.version < 0 {
            return Err(FleetError::InvalidInput(format!(
                "version must not be negative, got {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Acknowledgement an agent sends after applying a DNS sync
pub const SYNC_DNS_ACK: &str = "synced";

/// Whether a sync_dns reply body is the expected acknowledgement
pub fn is_sync_dns_ack(body: &serde_json::Value) -> bool {
    body.get("value").and_then(|v| v.as_str()) == Some(SYNC_DNS_ACK)
}
