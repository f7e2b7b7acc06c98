pub mod instance;
pub mod request;

pub use instance::*;
pub use request::*;

use serde::{Deserialize, Serialize};

/// Last DNS version written for an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub agent_id: String,
    pub version: i64,
}
