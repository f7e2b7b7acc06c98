use thiserror::Error;

/// Main error type for the fleet broadcaster
#[derive(Error, Debug)]
pub enum FleetError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Unique constraint violated: {table}.{key}")]
    UniqueViolation { table: String, key: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Caller errors, raised before anything is dispatched
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Agent errors
    #[error("Agent not found: {agent_id} ({instance})")]
    AgentNotFound { agent_id: String, instance: String },

    #[error("Agent call {method} failed for {agent_id}: {reason}")]
    AgentCall {
        agent_id: String,
        method: String,
        reason: String,
    },

    // Logging setup
    #[error("Logging error: {0}")]
    Logging(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl FleetError {
    /// Build an agent call failure
    pub fn agent_call(agent_id: &str, method: &str, reason: impl std::fmt::Display) -> Self {
        FleetError::AgentCall {
            agent_id: agent_id.to_string(),
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a uniqueness conflict on insert
    pub fn is_unique_violation(&self) -> bool {
        match self {
            FleetError::UniqueViolation { .. } => true,
            FleetError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type alias for FleetError
pub type Result<T> = std::result::Result<T, FleetError>;
