//! The WebSocket wire protocol between server and student client.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound
//! frames the server does not recognize are logged and dropped, never
//! fatal: the client may be a newer build than the server.

use serde::{Deserialize, Serialize};

/// Frames the server sends to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A correlated data request. The client must answer with a
    /// `response` frame carrying the same `request_id`.
    Request {
        request_id: String,
        resource: String,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        params: serde_json::Value,
    },

    /// The tutor speaks. The client renders/voices the text.
    AiResponse { text: String, tone: String },

    /// Show a visual hint overlay.
    VisualHint {
        hint_type: String,
        content: String,
        position: String,
    },

    /// Remove any visible hint overlay.
    ClearVisualHint,

    /// Draw on the shared whiteboard.
    WhiteboardDraw { instructions: serde_json::Value },

    /// Echo of a transcribed utterance, so the client can caption it.
    Transcript { text: String },

    /// Observation notes surfaced for debugging UIs.
    Debug { message: String },

    /// Session acknowledged and loop running.
    SessionStarted { session_id: String },

    /// Keepalive reply.
    Pong,

    /// Something went wrong server-side.
    Error { message: String },
}

/// Frames the client sends to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Answer to a prior `request` frame.
    Response {
        request_id: String,
        #[serde(default)]
        payload: serde_json::Value,
    },

    /// Client-side event notification (e.g. "drawing_started").
    ClientEvent { event: String },

    /// A chunk of microphone audio, base64-encoded.
    AudioChunk { data: String },

    /// A whiteboard snapshot, base64-encoded PNG, with a change flag
    /// computed client-side against the previous frame.
    WhiteboardFrame {
        image: String,
        #[serde(default)]
        changed: bool,
    },

    /// Keepalive.
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_shape() {
        let msg = ServerMessage::Request {
            request_id: "tool_req_1".into(),
            resource: "audio".into(),
            params: serde_json::json!({"duration_seconds": 30}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"request""#));
        assert!(json.contains(r#""request_id":"tool_req_1""#));
        assert!(json.contains(r#""resource":"audio""#));
    }

    #[test]
    fn request_frame_omits_null_params() {
        let msg = ServerMessage::Request {
            request_id: "tool_req_2".into(),
            resource: "whiteboard".into(),
            params: serde_json::Value::Null,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("params"));
    }

    #[test]
    fn response_frame_parses() {
        let json = r#"{"type":"response","request_id":"tool_req_1","payload":{"audio":"aGk="}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Response {
                request_id,
                payload,
            } => {
                assert_eq!(request_id, "tool_req_1");
                assert_eq!(payload["audio"], "aGk=");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn response_frame_tolerates_missing_payload() {
        let json = r#"{"type":"response","request_id":"tool_req_9"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Response { payload, .. } => assert!(payload.is_null()),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn ping_pong_shapes() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));
        let pong = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(pong, r#"{"type":"pong"}"#);
    }

    #[test]
    fn unknown_inbound_type_is_an_error_not_a_panic() {
        let json = r#"{"type":"hologram_frame","data":"..."}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }
}
