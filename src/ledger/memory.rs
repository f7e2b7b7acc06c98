use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::VersionRepository;
use crate::domain::VersionRecord;
use crate::error::{FleetError, Result};

/// Version records kept in process memory
#[derive(Default)]
pub struct InMemoryVersionRepository {
    versions: DashMap<String, i64>,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn insert(&self, agent_id: &str, version: i64) -> Result<()> {
        match self.versions.entry(agent_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(version);
                Ok(())
            }
            Entry::Occupied(_) => Err(FleetError::UniqueViolation {
                table: "agent_dns_versions".to_string(),
                key: agent_id.to_string(),
            }),
        }
    }

    async fn find(&self, agent_id: &str) -> Result<Option<VersionRecord>> {
        Ok(self.versions.get(agent_id).map(|entry| VersionRecord {
            agent_id: entry.key().clone(),
            version: *entry.value(),
        }))
    }

    async fn update(&self, record: &VersionRecord) -> Result<()> {
        match self.versions.get_mut(&record.agent_id) {
            Some(mut entry) => {
                *entry = record.version;
                Ok(())
            }
            None => Err(FleetError::Internal(format!(
                "no version record for agent {}",
                record.agent_id
            ))),
        }
    }

    async fn all(&self) -> Result<Vec<VersionRecord>> {
        let mut records: Vec<VersionRecord> = self
            .versions
            .iter()
            .map(|entry| VersionRecord {
                agent_id: entry.key().clone(),
                version: *entry.value(),
            })
            .collect();
        records.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(records)
    }
}
