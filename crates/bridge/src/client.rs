//! Per-session client handle.
//!
//! A [`ClientHandle`] is what tool handlers hold: it can push a fire-and-
//! forget notification or issue a correlated request and suspend until
//! the client answers, times out, or disconnects.

use crate::messages::ServerMessage;
use crate::pending::PendingRequests;
use oxtutor_core::error::BridgeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// How long a handler waits for a client answer unless it says otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A cloneable handle onto one connected client.
///
/// The outbound channel feeds the session's WebSocket writer task; the
/// pending table is shared with the reader task, which resolves entries
/// as `response` frames arrive.
#[derive(Clone)]
pub struct ClientHandle {
    outbound: mpsc::Sender<ServerMessage>,
    pending: Arc<PendingRequests>,
}

impl ClientHandle {
    pub fn new(outbound: mpsc::Sender<ServerMessage>, pending: Arc<PendingRequests>) -> Self {
        Self { outbound, pending }
    }

    pub fn pending(&self) -> &Arc<PendingRequests> {
        &self.pending
    }

    /// Push an uncorrelated notification. No answer expected.
    pub async fn notify(&self, message: ServerMessage) -> Result<(), BridgeError> {
        self.outbound
            .send(message)
            .await
            .map_err(|e| BridgeError::Closed(e.to_string()))
    }

    /// Request a resource from the client with the default 5s timeout.
    pub async fn request(
        &self,
        resource: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        self.request_with_timeout(resource, params, DEFAULT_REQUEST_TIMEOUT)
            .await
    }

    /// Request a resource from the client, suspending until a matching
    /// response arrives or `timeout` elapses.
    ///
    /// The pending entry is registered before the frame is sent, so a
    /// response cannot race past an unregistered id.
    pub async fn request_with_timeout(
        &self,
        resource: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, BridgeError> {
        let request_id = self.pending.next_id();
        let rx = self.pending.register(&request_id);

        let frame = ServerMessage::Request {
            request_id: request_id.clone(),
            resource: resource.to_string(),
            params,
        };

        if let Err(e) = self.outbound.send(frame).await {
            self.pending.cancel(&request_id);
            return Err(BridgeError::Closed(e.to_string()));
        }

        debug!(request_id = %request_id, resource, "Awaiting client response");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            // Sender dropped: disconnect or session stop cleared the table.
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => {
                self.pending.cancel(&request_id);
                Err(BridgeError::Timeout)
            }
        }
    }
}
