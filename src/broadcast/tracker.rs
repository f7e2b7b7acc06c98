//! Outcome bookkeeping for one deadline broadcast

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{BroadcastRequest, RequestId, RequestOutcome};

struct Slot {
    seq: usize,
    request: BroadcastRequest,
}

/// Outcome tally of a tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
    pub unresponsive: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.pending + self.success + self.failed + self.unresponsive
    }
}

/// Request id → request map for a single broadcast.
///
/// Every entry leaves `Pending` at most once. Resolutions race freely from
/// completion handlers and the deadline handler; the first one wins and later
/// ones are dropped.
#[derive(Default)]
pub struct ResponseTracker {
    requests: DashMap<RequestId, Slot>,
    next_seq: AtomicUsize,
}

impl ResponseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a dispatched request. Returns false if the id is already tracked.
    pub fn register(&self, request_id: RequestId, agent_id: &str, instance_name: &str) -> bool {
        match self.requests.entry(request_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                let request =
                    BroadcastRequest::pending(vacant.key().clone(), agent_id, instance_name);
                vacant.insert(Slot { seq, request });
                true
            }
        }
    }

    /// Move a pending request to a terminal outcome.
    ///
    /// Returns true only for the call that made the transition.
    pub fn resolve(&self, request_id: &RequestId, outcome: RequestOutcome) -> bool {
        if !outcome.is_terminal() {
            return false;
        }
        match self.requests.get_mut(request_id) {
            Some(mut slot) if slot.request.outcome == RequestOutcome::Pending => {
                slot.request.outcome = outcome;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, request_id: &RequestId) -> Option<BroadcastRequest> {
        self.requests.get(request_id).map(|slot| slot.request.clone())
    }

    /// Requests still pending, in registration order
    pub fn pending(&self) -> Vec<BroadcastRequest> {
        self.collect(|request| request.outcome == RequestOutcome::Pending)
    }

    /// Mark every pending request unresponsive and return those requests,
    /// in registration order
    pub fn expire_pending(&self) -> Vec<BroadcastRequest> {
        let mut expired: Vec<(usize, BroadcastRequest)> = Vec::new();
        for mut slot in self.requests.iter_mut() {
            if slot.request.outcome == RequestOutcome::Pending {
                slot.request.outcome = RequestOutcome::Unresponsive;
                expired.push((slot.seq, slot.request.clone()));
            }
        }
        expired.sort_by_key(|(seq, _)| *seq);
        expired.into_iter().map(|(_, request)| request).collect()
    }

    pub fn all_resolved(&self) -> bool {
        self.requests
            .iter()
            .all(|slot| slot.request.outcome.is_terminal())
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for slot in self.requests.iter() {
            match slot.request.outcome {
                RequestOutcome::Pending => counts.pending += 1,
                RequestOutcome::Success => counts.success += 1,
                RequestOutcome::Failed => counts.failed += 1,
                RequestOutcome::Unresponsive => counts.unresponsive += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn collect(&self, keep: impl Fn(&BroadcastRequest) -> bool) -> Vec<BroadcastRequest> {
        let mut selected: Vec<(usize, BroadcastRequest)> = self
            .requests
            .iter()
            .filter(|slot| keep(&slot.request))
            .map(|slot| (slot.seq, slot.request.clone()))
            .collect();
        selected.sort_by_key(|(seq, _)| *seq);
        selected.into_iter().map(|(_, request)| request).collect()
    }
}
