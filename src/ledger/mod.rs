//! Per-Agent Version Ledger
//!
//! Records the last DNS version each agent acknowledged. Overlapping
//! broadcasts write the same rows without any shared lock; the ledger
//! settles the race itself by inserting first and updating on conflict.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryVersionRepository;
pub use postgres::PgVersionRepository;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::VersionRecord;
use crate::error::{FleetError, Result};

/// Storage for version records, unique by agent id
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Insert a new record. Fails with a unique violation if one exists.
    async fn insert(&self, agent_id: &str, version: i64) -> Result<()>;

    async fn find(&self, agent_id: &str) -> Result<Option<VersionRecord>>;

    /// Save an existing record
    async fn update(&self, record: &VersionRecord) -> Result<()>;

    async fn all(&self) -> Result<Vec<VersionRecord>>;
}

/// Race-safe writer over a `VersionRepository`
#[derive(Clone)]
pub struct VersionLedger {
    repo: Arc<dyn VersionRepository>,
}

impl VersionLedger {
    pub fn new(repo: Arc<dyn VersionRepository>) -> Self {
        Self { repo }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryVersionRepository::new()))
    }

    /// Record `version` for `agent_id`. Never fails.
    ///
    /// Last writer wins: the stored version is overwritten even when it is
    /// newer than `version`.
    pub async fn upsert(&self, agent_id: &str, version: i64) {
        match self.repo.insert(agent_id, version).await {
            Ok(()) => debug!("Recorded DNS version {} for agent {}", version, agent_id),
            Err(e) if e.is_unique_violation() => {
                if let Err(e) = self.update_existing(agent_id, version).await {
                    error!(
                        "Failed to update DNS version {} for agent {}: {}",
                        version, agent_id, e
                    );
                }
            }
            Err(e) => error!(
                "Failed to record DNS version {} for agent {}: {}",
                version, agent_id, e
            ),
        }
    }

    async fn update_existing(&self, agent_id: &str, version: i64) -> Result<()> {
        let Some(mut record) = self.repo.find(agent_id).await? else {
            warn!(
                "DNS version row for agent {} vanished after insert conflict",
                agent_id
            );
            return Err(FleetError::Internal(format!(
                "no version record for agent {agent_id}"
            )));
        };

        record.version = version;
        self.repo.update(&record).await?;
        debug!("Updated DNS version {} for agent {}", version, agent_id);
        Ok(())
    }

    pub async fn version_for(&self, agent_id: &str) -> Result<Option<i64>> {
        Ok(self.repo.find(agent_id).await?.map(|r| r.version))
    }

    pub async fn records(&self) -> Result<Vec<VersionRecord>> {
        self.repo.all().await
    }
}
