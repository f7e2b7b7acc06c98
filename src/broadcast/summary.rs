use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one deadline broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSummary {
    /// Targets handed to the broadcast
    pub total: usize,
    pub successful: usize,
    /// Unexpected replies plus targets that could not be dispatched
    pub failed: usize,
    pub unresponsive: usize,
    /// Wall time since dispatch began
    pub elapsed_ms: u128,
    /// Agents that were still silent at the deadline, in dispatch order
    pub unresponsive_agents: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl BroadcastSummary {
    /// Outcome counts add up to the number of targets
    pub fn is_consistent(&self) -> bool {
        self.successful + self.failed + self.unresponsive == self.total
    }
}

impl std::fmt::Display for BroadcastSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "attempted {} agents in {}ms ({} successful, {} failed, {} unresponsive)",
            self.total, self.elapsed_ms, self.successful, self.failed, self.unresponsive
        )
    }
}
