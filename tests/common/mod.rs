//! Shared fixtures for broadcaster integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fleet_broadcast::{
    AgentBroadcaster, AgentProxy, BroadcasterConfig, FleetError, InMemoryInventory,
    InMemoryVersionRepository, InstanceSelector, ManagedInstance, RequestId, Result,
    StaticAgentDirectory, SyncDnsCallback, VersionLedger, VersionRecord, VersionRepository,
    VirtualMachine,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// How a fake agent answers sync_dns
#[derive(Debug, Clone)]
pub enum Reply {
    /// Before sync_dns returns
    Now(Value),
    /// From a background task after the delay
    After(Duration, Value),
    /// Never; the callback is held until the agent is dropped
    Never,
}

impl Reply {
    pub fn synced() -> Self {
        Reply::Now(json!({"value": "synced"}))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DeleteArp { agent_id: String, ips: Vec<String> },
    SyncDns { agent_id: String, request_id: String },
    CancelSyncDns { agent_id: String, request_id: String },
}

/// Calls seen by every fake agent of a fleet, in arrival order
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn cancellations(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CancelSyncDns {
                    agent_id,
                    request_id,
                } => Some((agent_id, request_id)),
                _ => None,
            })
            .collect()
    }

    pub fn arp_deletions(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DeleteArp { agent_id, ips } => Some((agent_id, ips)),
                _ => None,
            })
            .collect()
    }
}

/// Scripted agent proxy
pub struct FakeAgent {
    agent_id: String,
    reply: Reply,
    dispatch_delay: Duration,
    cancel_delay: Duration,
    fail_dispatch: bool,
    fail_arp: bool,
    log: CallLog,
    next_request: AtomicUsize,
    held: Mutex<Vec<SyncDnsCallback>>,
}

impl FakeAgent {
    pub fn new(agent_id: &str, reply: Reply, log: &CallLog) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            reply,
            dispatch_delay: Duration::ZERO,
            cancel_delay: Duration::ZERO,
            fail_dispatch: false,
            fail_arp: false,
            log: log.clone(),
            next_request: AtomicUsize::new(1),
            held: Mutex::new(Vec::new()),
        }
    }

    /// sync_dns takes this long to return
    pub fn dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay = delay;
        self
    }

    /// cancel_sync_dns takes this long to return, after it is logged
    pub fn cancel_delay(mut self, delay: Duration) -> Self {
        self.cancel_delay = delay;
        self
    }

    pub fn failing_dispatch(mut self) -> Self {
        self.fail_dispatch = true;
        self
    }

    pub fn failing_arp(mut self) -> Self {
        self.fail_arp = true;
        self
    }

    fn unreachable(&self, method: &str) -> FleetError {
        FleetError::agent_call(&self.agent_id, method, "connection refused")
    }
}

#[async_trait]
impl AgentProxy for FakeAgent {
    async fn delete_arp_entries(&self, ip_addresses: &[String]) -> Result<()> {
        if self.fail_arp {
            return Err(self.unreachable("delete_arp_entries"));
        }
        self.log.push(Call::DeleteArp {
            agent_id: self.agent_id.clone(),
            ips: ip_addresses.to_vec(),
        });
        Ok(())
    }

    async fn sync_dns(
        &self,
        _blob_id: &str,
        _checksum: &str,
        _version: i64,
        on_complete: SyncDnsCallback,
    ) -> Result<RequestId> {
        if !self.dispatch_delay.is_zero() {
            tokio::time::sleep(self.dispatch_delay).await;
        }
        if self.fail_dispatch {
            return Err(self.unreachable("sync_dns"));
        }

        let n = self.next_request.fetch_add(1, Ordering::SeqCst);
        let request_id = format!("{}-req-{}", self.agent_id, n);
        self.log.push(Call::SyncDns {
            agent_id: self.agent_id.clone(),
            request_id: request_id.clone(),
        });

        match &self.reply {
            Reply::Now(body) => on_complete(body.clone()),
            Reply::After(delay, body) => {
                let (delay, body) = (*delay, body.clone());
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_complete(body);
                });
            }
            Reply::Never => self.held.lock().unwrap().push(on_complete),
        }

        Ok(RequestId::new(request_id))
    }

    async fn cancel_sync_dns(&self, request_id: &RequestId) -> Result<()> {
        self.log.push(Call::CancelSyncDns {
            agent_id: self.agent_id.clone(),
            request_id: request_id.to_string(),
        });
        if !self.cancel_delay.is_zero() {
            tokio::time::sleep(self.cancel_delay).await;
        }
        Ok(())
    }
}

/// In-memory repository whose every call takes `delay`
pub struct SlowRepository {
    inner: InMemoryVersionRepository,
    delay: Duration,
}

impl SlowRepository {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryVersionRepository::new(),
            delay,
        }
    }
}

#[async_trait]
impl VersionRepository for SlowRepository {
    async fn insert(&self, agent_id: &str, version: i64) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(agent_id, version).await
    }

    async fn find(&self, agent_id: &str) -> Result<Option<VersionRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(agent_id).await
    }

    async fn update(&self, record: &VersionRecord) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(record).await
    }

    async fn all(&self) -> Result<Vec<VersionRecord>> {
        self.inner.all().await
    }
}

/// Let background cancellations run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

pub fn instance(index: u32, agent_id: &str, cid: &str) -> ManagedInstance {
    ManagedInstance::new("fake-job-1", index).with_vm(VirtualMachine::new(agent_id, cid))
}

/// Broadcaster over `instances`, with every fake registered under its agent id
pub fn broadcaster(
    instances: Vec<ManagedInstance>,
    agents: Vec<FakeAgent>,
    ledger: VersionLedger,
    timeout: Duration,
) -> AgentBroadcaster {
    let directory = StaticAgentDirectory::new();
    for agent in agents {
        let agent_id = agent.agent_id.clone();
        directory.register(agent_id, Arc::new(agent));
    }

    AgentBroadcaster::new(
        InstanceSelector::new(Arc::new(InMemoryInventory::new(instances))),
        Arc::new(directory),
        ledger,
        &BroadcasterConfig::with_timeout(timeout),
    )
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's tracing output into the capture until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// True if some line at `level` contains `message`
    pub fn has(&self, level: &str, message: &str) -> bool {
        self.lines()
            .iter()
            .any(|line| line.contains(level) && line.contains(message))
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.0))
    }
}
