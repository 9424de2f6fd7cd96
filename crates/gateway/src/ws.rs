//! The WebSocket side of a session.
//!
//! One task per direction: a writer draining the session's outbound
//! channel onto the socket, and a reader dispatching inbound frames —
//! correlated responses into the pending table, media into session state,
//! keepalives straight back. The observation loop is spawned when the
//! socket binds and stopped when it goes away.

use crate::session::SessionHandle;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use oxtutor_bridge::{ClientHandle, ClientMessage, ServerMessage};
use oxtutor_cognitive::{LoopConfig, ToolOodaLoop, TriggerDetector};
use oxtutor_core::{Provider, StudentRepository, Transcriber, VisionAnalyzer};
use oxtutor_tools::{ToolContext, session_registry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound channel depth; beyond this the loop's sends apply backpressure.
const OUTBOUND_BUFFER: usize = 64;

/// Everything the socket task needs that is not on the [`SessionHandle`].
pub struct SessionWiring {
    pub provider: Arc<dyn Provider>,
    pub repository: Arc<dyn StudentRepository>,
    pub transcriber: Arc<dyn Transcriber>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub model: String,
    pub loop_config: LoopConfig,
    pub triggers: TriggerDetector,
}

/// Drive one bound socket until it closes or the session stops.
pub async fn run_session(socket: WebSocket, handle: Arc<SessionHandle>, wiring: SessionWiring) {
    let (tx, rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let client = ClientHandle::new(tx.clone(), handle.pending.clone());

    if client
        .notify(ServerMessage::SessionStarted {
            session_id: handle.session_id.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    let ctx = Arc::new(ToolContext {
        session: handle.session.clone(),
        student: handle.student.clone(),
        repository: wiring.repository.clone(),
        transcriber: wiring.transcriber.clone(),
        vision: wiring.vision.clone(),
        client: client.clone(),
        observation: handle.observation.clone(),
    });

    let registry = match session_registry(ctx) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            warn!(error = %e, "Failed to build tool registry");
            let _ = client
                .notify(ServerMessage::Error {
                    message: "internal error building session".into(),
                })
                .await;
            return;
        }
    };

    let ooda = ToolOodaLoop::new(
        wiring.provider.clone(),
        &wiring.model,
        registry,
        handle.session.clone(),
        handle.observation.clone(),
        wiring.loop_config.clone(),
        handle.stop.subscribe(),
        handle.wake.clone(),
    );
    let loop_task = tokio::spawn(ooda.run());

    let (mut sink, mut stream) = socket.split();

    // Writer: outbound channel -> socket.
    let writer_task = tokio::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, "Unserializable outbound frame");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: socket -> dispatch, on this task.
    let io = SessionIo {
        handle: handle.clone(),
        outbound: tx,
        transcriber: wiring.transcriber,
        triggers: wiring.triggers,
    };
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, "Socket read error");
                break;
            }
        };
        match frame {
            WsMessage::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => io.dispatch(message).await,
                Err(e) => debug!(error = %e, "Dropping unrecognized inbound frame"),
            },
            WsMessage::Close(_) => break,
            // Binary, ping, pong frames are not part of the protocol.
            _ => {}
        }
    }

    info!(session_id = %handle.session_id, "Client disconnected");
    handle.shut_down();
    handle.disconnect();
    let _ = loop_task.await;
    writer_task.abort();
}

/// The reader's dispatch context.
struct SessionIo {
    handle: Arc<SessionHandle>,
    outbound: mpsc::Sender<ServerMessage>,
    transcriber: Arc<dyn Transcriber>,
    triggers: TriggerDetector,
}

impl SessionIo {
    async fn dispatch(&self, message: ClientMessage) {
        match message {
            ClientMessage::Response {
                request_id,
                payload,
            } => {
                self.handle.pending.resolve(&request_id, payload);
            }

            ClientMessage::Ping => {
                let _ = self.outbound.send(ServerMessage::Pong).await;
            }

            ClientMessage::ClientEvent { event } => self.apply_event(&event).await,

            ClientMessage::AudioChunk { data } => self.ingest_audio(&data).await,

            ClientMessage::WhiteboardFrame { image, changed } => {
                self.ingest_frame(image, changed).await;
            }
        }
    }

    async fn apply_event(&self, event: &str) {
        let mut session = self.handle.session.lock().await;
        match event {
            "speech_started" => session.student_is_speaking = true,
            "speech_stopped" => {
                session.student_is_speaking = false;
                session.last_speech_time = Some(Utc::now());
            }
            "drawing_started" => session.student_is_writing = true,
            "drawing_stopped" => {
                session.student_is_writing = false;
                session.last_whiteboard_change = Some(Utc::now());
            }
            other => debug!(event = other, "Ignoring unknown client event"),
        }
    }

    /// Transcribe a pushed audio chunk, record it, and echo the caption.
    async fn ingest_audio(&self, data: &str) {
        let bytes = match BASE64.decode(data) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "Undecodable audio chunk");
                return;
            }
        };
        let text = match self.transcriber.transcribe(&bytes).await {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "Transcription failed for pushed audio");
                return;
            }
        };
        if text.is_empty() {
            return;
        }

        let now = Utc::now();
        {
            let mut session = self.handle.session.lock().await;
            session.add_transcript(&text, now);
        }
        let _ = self
            .outbound
            .send(ServerMessage::Transcript { text })
            .await;
        self.evaluate_triggers(None).await;
    }

    /// Store a whiteboard snapshot and score how much it changed.
    async fn ingest_frame(&self, image: String, changed: bool) {
        let score = {
            let mut session = self.handle.session.lock().await;
            let score = match (&session.whiteboard_snapshot, changed) {
                (_, true) => 1.0,
                (Some(prev), false) => frame_change_score(prev, &image),
                (None, false) => 1.0,
            };
            if score > 0.0 {
                session.last_whiteboard_change = Some(Utc::now());
            }
            session.whiteboard_snapshot = Some(image);
            score
        };
        self.evaluate_triggers(Some(score)).await;
    }

    /// Run trigger detection and wake the loop early on a hit.
    async fn evaluate_triggers(&self, visual_change: Option<f64>) {
        let decision = {
            let session = self.handle.session.lock().await;
            self.triggers.evaluate(&session, visual_change, Utc::now())
        };
        if decision.triggered {
            debug!(reasons = ?decision.reasons, "Trigger fired, waking loop");
            self.handle.wake.notify_one();
        }
    }
}

/// Cheap change estimate between two base64 frames: sampled character
/// difference plus size delta, normalized to 0.0..=1.0. A pixel-accurate
/// diff is the client's job; this is only a trigger heuristic.
pub fn frame_change_score(previous: &str, current: &str) -> f64 {
    if previous == current {
        return 0.0;
    }
    let len_a = previous.len().max(1);
    let len_b = current.len().max(1);
    let size_delta = (len_a.abs_diff(len_b)) as f64 / len_a.max(len_b) as f64;

    let span = len_a.min(len_b);
    let stride = (span / 256).max(1);
    let a = previous.as_bytes();
    let b = current.as_bytes();
    let mut samples = 0usize;
    let mut differing = 0usize;
    let mut i = 0;
    while i < span {
        samples += 1;
        if a[i] != b[i] {
            differing += 1;
        }
        i += stride;
    }
    let sample_delta = differing as f64 / samples.max(1) as f64;

    (size_delta + sample_delta).min(1.0)
}
