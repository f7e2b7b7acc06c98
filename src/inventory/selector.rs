use std::sync::Arc;
use tracing::debug;

use super::InstanceDirectory;
use crate::domain::ManagedInstance;
use crate::error::Result;

/// Selects broadcast targets from the inventory
#[derive(Clone)]
pub struct InstanceSelector {
    directory: Arc<dyn InstanceDirectory>,
}

impl InstanceSelector {
    pub fn new(directory: Arc<dyn InstanceDirectory>) -> Self {
        Self { directory }
    }

    /// Instances with an operable agent, minus the VM identified by
    /// `exclude_cid` (a VM still being created has no agent to talk to).
    pub async fn select(&self, exclude_cid: Option<&str>) -> Result<Vec<ManagedInstance>> {
        let instances = self.directory.instances().await?;
        let known = instances.len();
        let selected = filter_instances(instances, exclude_cid);
        debug!(
            "Selected {} of {} instances (excluding cid {:?})",
            selected.len(),
            known,
            exclude_cid
        );
        Ok(selected)
    }
}

/// Keep the instances that may receive a broadcast, in their original order.
///
/// Dropped: instances without a VM or whose VM is inactive, compilation
/// instances, and the instance whose active VM has cid `exclude_cid`.
pub fn filter_instances(
    instances: Vec<ManagedInstance>,
    exclude_cid: Option<&str>,
) -> Vec<ManagedInstance> {
    instances
        .into_iter()
        .filter(|instance| {
            let Some(vm) = instance.active_vm() else {
                return false;
            };
            if instance.compilation {
                return false;
            }
            exclude_cid.map_or(true, |cid| vm.cid != cid)
        })
        .collect()
}
