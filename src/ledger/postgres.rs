use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{info, instrument};

use super::VersionRepository;
use crate::config::DatabaseConfig;
use crate::domain::VersionRecord;
use crate::error::{FleetError, Result};

/// PostgreSQL storage for version records
#[derive(Clone)]
pub struct PgVersionRepository {
    pool: PgPool,
}

impl PgVersionRepository {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Reuse an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VersionRepository for PgVersionRepository {
    #[instrument(skip(self))]
    async fn insert(&self, agent_id: &str, version: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO agent_dns_versions (agent_id, dns_version)
            VALUES ($1, $2)
            "#,
        )
        .bind(agent_id)
        .bind(version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(FleetError::UniqueViolation {
                    table: "agent_dns_versions".to_string(),
                    key: agent_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, agent_id: &str) -> Result<Option<VersionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT agent_id, dns_version
            FROM agent_dns_versions WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| VersionRecord {
            agent_id: r.get("agent_id"),
            version: r.get("dns_version"),
        }))
    }

    #[instrument(skip(self))]
    async fn update(&self, record: &VersionRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE agent_dns_versions
            SET dns_version = $2
            WHERE agent_id = $1
            "#,
        )
        .bind(&record.agent_id)
        .bind(record.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FleetError::Internal(format!(
                "no version record for agent {}",
                record.agent_id
            )));
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<VersionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT agent_id, dns_version
            FROM agent_dns_versions
            ORDER BY agent_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| VersionRecord {
                agent_id: r.get("agent_id"),
                version: r.get("dns_version"),
            })
            .collect())
    }
}
