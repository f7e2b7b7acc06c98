//! Agent Broadcasts
//!
//! Fan-out of one command to a set of agents:
//! - `AgentBroadcaster` dispatches and collects within a deadline
//! - `ResponseTracker` holds the per-request outcome of one broadcast
//! - `BroadcastSummary` and `BroadcastMetrics` report what happened

pub mod broadcaster;
pub mod metrics;
pub mod summary;
pub mod tracker;

pub use broadcaster::AgentBroadcaster;
pub use metrics::{BroadcastMetrics, MetricsSnapshot};
pub use summary::BroadcastSummary;
pub use tracker::{OutcomeCounts, ResponseTracker};
