//! Routing of downstream responses to waiting requesters.

use dashmap::DashMap;
use tokio::sync::oneshot;

use super::protocol::RequestId;
use crate::error::{RelayError, RelayResult};

/// Maps in-flight request IDs to the oneshot sender their response goes to.
///
/// Requests register before they are written so a fast response can never
/// arrive ahead of its waiter. Overlapping completion requests each have
/// their own entry; responses are matched purely by ID, so interleaved
/// arrival order does not matter.
pub(crate) struct ResponseRouter {
    pending: DashMap<RequestId, oneshot::Sender<RelayResult<serde_json::Value>>>,
}

impl ResponseRouter {
    pub(crate) fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Register a request and get the receiver its response will arrive on.
    pub(crate) fn register(
        &self,
        request_id: RequestId,
    ) -> oneshot::Receiver<RelayResult<serde_json::Value>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);
        rx
    }

    /// Remove a registration without delivering anything. The waiter sees a
    /// closed channel. Used on send failures.
    pub(crate) fn remove(&self, request_id: RequestId) {
        self.pending.remove(&request_id);
    }

    /// Deliver a response envelope to its waiter.
    ///
    /// Returns `false` when no waiter is registered for the message's ID,
    /// which also covers messages without a numeric ID.
    pub(crate) fn route(&self, message: serde_json::Value) -> bool {
        let Some(request_id) = RequestId::from_json(&message) else {
            return false;
        };
        match self.pending.remove(&request_id) {
            Some((_, tx)) => tx.send(Ok(message)).is_ok(),
            None => false,
        }
    }

    /// Fail every pending request. Called when the reader hits EOF or a
    /// protocol error, so no waiter hangs on a dead connection.
    pub(crate) fn fail_all(&self, reason: &str) {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(RelayError::connection_lost(reason)));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
