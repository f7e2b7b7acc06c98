//! Agent Broadcaster
//!
//! Sends one command to many agents at once. `delete_arp_entries` is plain
//! fire-and-forget. `sync_dns` sends every request, then waits a single
//! response window: acknowledged agents get their version recorded, wrong
//! replies are failures, and agents still silent at the deadline are
//! cancelled and reported unresponsive. No single agent can fail the whole
//! broadcast.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{BroadcastMetrics, BroadcastSummary, ResponseTracker};
use crate::agent::{AgentDirectory, SyncDnsCallback};
use crate::config::BroadcasterConfig;
use crate::domain::{
    is_sync_dns_ack, BroadcastRequest, ManagedInstance, RequestId, RequestOutcome,
    SyncDnsPayload,
};
use crate::error::{FleetError, Result};
use crate::inventory::InstanceSelector;
use crate::ledger::VersionLedger;

/// Reply body delivered for the target at a dispatch slot
type Completion = (usize, serde_json::Value);

/// Fans commands out to the agents of managed instances
pub struct AgentBroadcaster {
    selector: InstanceSelector,
    agents: Arc<dyn AgentDirectory>,
    ledger: VersionLedger,
    timeout: Duration,
    metrics: Arc<BroadcastMetrics>,
}

impl AgentBroadcaster {
    pub fn new(
        selector: InstanceSelector,
        agents: Arc<dyn AgentDirectory>,
        ledger: VersionLedger,
        config: &BroadcasterConfig,
    ) -> Self {
        Self {
            selector,
            agents,
            ledger,
            timeout: config.timeout(),
            metrics: Arc::new(BroadcastMetrics::new()),
        }
    }

    /// Response window of `sync_dns`
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn metrics(&self) -> Arc<BroadcastMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Instances that can receive a broadcast, minus the VM with `exclude_cid`
    pub async fn select_targets(&self, exclude_cid: Option<&str>) -> Result<Vec<ManagedInstance>> {
        self.selector.select(exclude_cid).await
    }

    /// Tell every eligible agent to drop its ARP entries for `ip_addresses`.
    ///
    /// Returns once every call has been issued. A failing agent is logged and
    /// skipped; only an unreadable inventory is an error.
    pub async fn delete_arp_entries(
        &self,
        exclude_cid: Option<&str>,
        ip_addresses: &[String],
    ) -> Result<()> {
        let targets = self.select_targets(exclude_cid).await?;

        let deliveries = targets.iter().filter_map(|instance| {
            let agent_id = instance.agent_id()?;
            Some(self.deliver_arp_deletion(agent_id, instance.name(), ip_addresses))
        });
        join_all(deliveries).await;

        Ok(())
    }

    async fn deliver_arp_deletion(&self, agent_id: &str, instance_name: String, ips: &[String]) {
        match self.call_delete_arp_entries(agent_id, &instance_name, ips).await {
            Ok(()) => {
                self.metrics.inc_arp_deliveries();
                debug!("agent_broadcaster: delete_arp_entries[{}]: sent", agent_id);
            }
            Err(e) => {
                self.metrics.inc_dispatch_failures();
                error!("agent_broadcaster: delete_arp_entries[{}]: {}", agent_id, e);
            }
        }
    }

    async fn call_delete_arp_entries(
        &self,
        agent_id: &str,
        instance_name: &str,
        ips: &[String],
    ) -> Result<()> {
        let agent = self.agents.with_agent_id(agent_id, instance_name).await?;
        agent.delete_arp_entries(ips).await
    }

    /// Push a DNS blob to `targets` and wait for their acknowledgements.
    ///
    /// Fails only on bad input, before anything is sent. Every target ends up
    /// counted exactly once as successful, failed or unresponsive.
    pub async fn sync_dns(
        &self,
        targets: &[ManagedInstance],
        blob_id: &str,
        checksum: &str,
        version: i64,
    ) -> Result<BroadcastSummary> {
        let payload = SyncDnsPayload::new(blob_id, checksum, version);
        payload.validate()?;
        let agent_ids = target_agent_ids(targets)?;

        info!(
            "agent_broadcaster: sync_dns: sending to {} agents {:?}",
            agent_ids.len(),
            agent_ids
        );

        let started = Instant::now();
        let tracker = ResponseTracker::new();
        let (completion_tx, mut completions) = mpsc::unbounded_channel::<Completion>();
        let mut request_ids: Vec<Option<RequestId>> = Vec::with_capacity(targets.len());
        let mut undelivered = 0usize;

        for (slot, (instance, agent_id)) in targets.iter().zip(&agent_ids).enumerate() {
            let instance_name = instance.name();
            let tx = completion_tx.clone();
            let on_complete: SyncDnsCallback = Box::new(move |body| {
                // Receiver is gone once the broadcast has finished
                let _ = tx.send((slot, body));
            });

            let dispatched = self
                .call_sync_dns(agent_id, &instance_name, &payload, on_complete)
                .await
                .and_then(|request_id| {
                    if tracker.register(request_id.clone(), agent_id, &instance_name) {
                        Ok(request_id)
                    } else {
                        Err(FleetError::Internal(format!("duplicate request id {request_id}")))
                    }
                });

            match dispatched {
                Ok(request_id) => {
                    self.metrics.inc_dispatched();
                    request_ids.push(Some(request_id));
                }
                Err(e) => {
                    self.metrics.inc_dispatch_failures();
                    undelivered += 1;
                    error!("agent_broadcaster: sync_dns[{}]: failed to send: {}", agent_id, e);
                    request_ids.push(None);
                }
            }
        }
        drop(completion_tx);

        // The window opens only after the last request went out
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut ledger_writes: Vec<JoinHandle<()>> = Vec::new();

        while !tracker.all_resolved() {
            tokio::select! {
                // Replies already queued are taken before the deadline fires
                biased;

                completion = completions.recv() => match completion {
                    Some((slot, body)) => {
                        let write =
                            self.reconcile(&tracker, &request_ids, &agent_ids, slot, body, version);
                        ledger_writes.extend(write);
                    }
                    // Every outstanding callback was dropped, nothing more can arrive
                    None => break,
                },
                _ = &mut deadline => break,
            }
        }

        while let Ok((slot, body)) = completions.try_recv() {
            let write = self.reconcile(&tracker, &request_ids, &agent_ids, slot, body, version);
            ledger_writes.extend(write);
        }

        let stragglers = tracker.expire_pending();
        if !stragglers.is_empty() {
            let silent: Vec<&str> = stragglers.iter().map(|r| r.agent_id.as_str()).collect();
            warn!(
                "agent_broadcaster: sync_dns: no response received for {} agent(s): [{}]",
                silent.len(),
                silent.join(", ")
            );
            for request in &stragglers {
                self.cancel_straggler(request);
            }
        }

        for write in join_all(ledger_writes).await {
            if let Err(e) = write {
                error!("agent_broadcaster: sync_dns: ledger write aborted: {}", e);
            }
        }

        let counts = tracker.counts();
        let summary = BroadcastSummary {
            total: targets.len(),
            successful: counts.success,
            failed: counts.failed + undelivered,
            unresponsive: counts.unresponsive,
            elapsed_ms: started.elapsed().as_millis(),
            unresponsive_agents: stragglers.into_iter().map(|r| r.agent_id).collect(),
            completed_at: Utc::now(),
        };
        info!("agent_broadcaster: sync_dns: {}", summary);
        self.metrics.record(&summary);

        Ok(summary)
    }

    async fn call_sync_dns(
        &self,
        agent_id: &str,
        instance_name: &str,
        payload: &SyncDnsPayload,
        on_complete: SyncDnsCallback,
    ) -> Result<RequestId> {
        let agent = self.agents.with_agent_id(agent_id, instance_name).await?;
        agent
            .sync_dns(
                &payload.blob_id,
                &payload.checksum,
                payload.version,
                on_complete,
            )
            .await
    }

    /// Resolve the request at `slot` from its reply body. An acknowledgement
    /// starts the ledger write and hands back its task.
    fn reconcile(
        &self,
        tracker: &ResponseTracker,
        request_ids: &[Option<RequestId>],
        agent_ids: &[String],
        slot: usize,
        body: serde_json::Value,
        version: i64,
    ) -> Option<JoinHandle<()>> {
        let (Some(Some(request_id)), Some(agent_id)) = (request_ids.get(slot), agent_ids.get(slot))
        else {
            debug!("agent_broadcaster: sync_dns: dropping reply for untracked slot {}", slot);
            return None;
        };

        if is_sync_dns_ack(&body) {
            if tracker.resolve(request_id, RequestOutcome::Success) {
                let ledger = self.ledger.clone();
                let agent_id = agent_id.clone();
                return Some(tokio::spawn(async move {
                    ledger.upsert(&agent_id, version).await;
                }));
            }
        } else if tracker.resolve(request_id, RequestOutcome::Failed) {
            error!(
                "agent_broadcaster: sync_dns[{}]: received unexpected response {}",
                agent_id, body
            );
        }
        None
    }

    /// Best effort and not awaited; the outcome is only logged
    fn cancel_straggler(&self, request: &BroadcastRequest) {
        self.metrics.inc_cancellations();
        let agents = Arc::clone(&self.agents);
        let request = request.clone();
        tokio::spawn(async move {
            if let Err(e) = call_cancel_sync_dns(agents.as_ref(), &request).await {
                debug!(
                    "agent_broadcaster: sync_dns[{}]: cancel of {} not delivered: {}",
                    request.agent_id, request.request_id, e
                );
            }
        });
    }
}

async fn call_cancel_sync_dns(agents: &dyn AgentDirectory, request: &BroadcastRequest) -> Result<()> {
    let agent = agents
        .with_agent_id(&request.agent_id, &request.instance_name)
        .await?;
    agent.cancel_sync_dns(&request.request_id).await
}

fn target_agent_ids(targets: &[ManagedInstance]) -> Result<Vec<String>> {
    targets
        .iter()
        .map(|instance| {
            instance.agent_id().map(str::to_string).ok_or_else(|| {
                FleetError::InvalidInput(format!(
                    "instance {} has no active VM to broadcast to",
                    instance.name()
                ))
            })
        })
        .collect()
}
