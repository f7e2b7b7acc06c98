pub mod agent;
pub mod broadcast;
pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod logging;

pub use agent::{AgentDirectory, AgentProxy, StaticAgentDirectory, SyncDnsCallback};
pub use broadcast::{
    AgentBroadcaster, BroadcastMetrics, BroadcastSummary, MetricsSnapshot, ResponseTracker,
};
pub use config::{AppConfig, BroadcasterConfig, DatabaseConfig, LoggingConfig};
pub use domain::{
    BroadcastRequest, ManagedInstance, RequestId, RequestOutcome, SyncDnsPayload, VersionRecord,
    VirtualMachine,
};
pub use error::{FleetError, Result};
pub use inventory::{InMemoryInventory, InstanceDirectory, InstanceSelector};
pub use ledger::{InMemoryVersionRepository, PgVersionRepository, VersionLedger, VersionRepository};
