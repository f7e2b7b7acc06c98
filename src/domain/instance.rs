use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A virtual machine backing a managed instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    /// Identity of the agent running on this VM
    pub agent_id: String,
    /// Cloud allocation identifier
    pub cid: String,
    /// Only the active VM of an instance has an operable agent
    pub active: bool,
    /// Network spec as stored (JSON text)
    #[serde(default)]
    pub network_spec_json: Option<String>,
}

impl VirtualMachine {
    pub fn new(agent_id: impl Into<String>, cid: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            cid: cid.into(),
            active: true,
            network_spec_json: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Decoded network spec; an empty object when none was stored
    pub fn network_spec(&self) -> serde_json::Value {
        self.network_spec_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }

    pub fn set_network_spec(&mut self, spec: &serde_json::Value) -> crate::error::Result<()> {
        self.network_spec_json = Some(serde_json::to_string(spec)?);
        Ok(())
    }
}

/// An instance of a deployment job, as read from the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedInstance {
    pub job: String,
    pub index: u32,
    pub uuid: Uuid,
    /// Transient build-only instance
    #[serde(default)]
    pub compilation: bool,
    #[serde(default)]
    pub vm: Option<VirtualMachine>,
}

impl ManagedInstance {
    pub fn new(job: impl Into<String>, index: u32) -> Self {
        Self {
            job: job.into(),
            index,
            uuid: Uuid::new_v4(),
            compilation: false,
            vm: None,
        }
    }

    pub fn with_vm(mut self, vm: VirtualMachine) -> Self {
        self.vm = Some(vm);
        self
    }

    pub fn compilation(mut self) -> Self {
        self.compilation = true;
        self
    }

    /// Display name, `<job>/<uuid>`
    pub fn name(&self) -> String {
        format!("{}/{}", self.job, self.uuid)
    }

    /// The VM with an operable agent, if any
    pub fn active_vm(&self) -> Option<&VirtualMachine> {
        self.vm.as_ref().filter(|vm| vm.active)
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.active_vm().map(|vm| vm.agent_id.as_str())
    }
}
