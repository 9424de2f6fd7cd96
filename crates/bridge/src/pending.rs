//! The pending-request table.
//!
//! Maps correlation ids to the oneshot senders of handlers suspended on
//! a client answer. Ids are monotonic and session-unique; an entry lives
//! from just before the request frame is sent until a matching response,
//! a timeout, or disconnect removes it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Correlated in-flight requests for one session.
///
/// Dropping a sender is the failure signal: the suspended receiver sees
/// the channel close and maps it to a disconnect/cancel error.
#[derive(Default)]
pub struct PendingRequests {
    counter: AtomicU64,
    inflight: Mutex<HashMap<String, oneshot::Sender<serde_json::Value>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next correlation id. Never reused within a session.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("tool_req_{n}")
    }

    /// Register a receiver under `id`. Must happen before the request
    /// frame goes out, or a fast client could answer before anyone is
    /// listening.
    pub fn register(&self, id: &str) -> oneshot::Receiver<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        if inflight.insert(id.to_string(), tx).is_some() {
            warn!(request_id = %id, "Replaced an already-pending request");
        }
        rx
    }

    /// Resolve the pending request for `id` with `payload`.
    ///
    /// Returns false when no such request is pending (late or duplicate
    /// response); callers log and discard.
    pub fn resolve(&self, id: &str, payload: serde_json::Value) -> bool {
        let sender = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
            inflight.remove(id)
        };
        match sender {
            Some(tx) => {
                // Send fails only if the handler already gave up (timeout).
                let delivered = tx.send(payload).is_ok();
                if !delivered {
                    debug!(request_id = %id, "Response arrived after handler timed out");
                }
                delivered
            }
            None => {
                debug!(request_id = %id, "Discarding response for unknown request id");
                false
            }
        }
    }

    /// Remove a pending entry without resolving it (handler timed out).
    pub fn cancel(&self, id: &str) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        inflight.remove(id);
    }

    /// Drop every pending entry. Each suspended handler observes the
    /// closed channel and resolves with a disconnect error. Called on
    /// client disconnect and on session stop.
    pub fn fail_all(&self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        let count = inflight.len();
        inflight.clear();
        if count > 0 {
            debug!(count, "Failed all pending requests");
        }
    }

    pub fn len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let pending = PendingRequests::new();
        assert_eq!(pending.next_id(), "tool_req_1");
        assert_eq!(pending.next_id(), "tool_req_2");
        assert_eq!(pending.next_id(), "tool_req_3");
    }

    #[tokio::test]
    async fn resolve_delivers_payload() {
        let pending = PendingRequests::new();
        let id = pending.next_id();
        let rx = pending.register(&id);

        assert!(pending.resolve(&id, serde_json::json!({"audio": "aGk="})));
        let payload = rx.await.unwrap();
        assert_eq!(payload["audio"], "aGk=");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn resolve_unknown_id_is_discarded() {
        let pending = PendingRequests::new();
        let id = pending.next_id();
        let _rx = pending.register(&id);

        assert!(!pending.resolve("tool_req_999", serde_json::json!({})));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn fail_all_closes_receivers() {
        let pending = PendingRequests::new();
        let id_a = pending.next_id();
        let id_b = pending.next_id();
        let rx_a = pending.register(&id_a);
        let rx_b = pending.register(&id_b);

        pending.fail_all();
        assert!(rx_a.await.is_err());
        assert!(rx_b.await.is_err());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn late_response_after_cancel_is_discarded() {
        let pending = PendingRequests::new();
        let id = pending.next_id();
        let rx = pending.register(&id);
        drop(rx);
        pending.cancel(&id);

        assert!(!pending.resolve(&id, serde_json::json!({"late": true})));
    }
}
