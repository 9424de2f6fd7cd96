//! Observation tools — read-only views onto the session.
//!
//! Each handler asks the client (or the in-memory state) for data and
//! reports what it found. Transport failures degrade to an `error` field
//! in the returned JSON; the reasoner adapts, the cycle survives.

use crate::context::ToolContext;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Utc;
use oxtutor_core::error::ToolError;
use oxtutor_core::tool::{Tool, ToolGroup, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Audio shorter than this is treated as silence, not sent to the
/// transcriber.
const MIN_AUDIO_MS: f64 = 200.0;

/// Rough PCM estimate (16 kHz, 16-bit mono) when the client does not
/// report a duration.
const BYTES_PER_MS: f64 = 32.0;

// --- get_audio_transcript ---

pub struct GetAudioTranscript {
    ctx: Arc<ToolContext>,
}

impl GetAudioTranscript {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetAudioTranscript {
    fn name(&self) -> &str {
        "get_audio_transcript"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Get a transcript of what the student said recently. Returns the transcribed text, or an empty result if the student has been quiet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "seconds": {
                    "type": "number",
                    "description": "How many seconds of recent audio to fetch",
                    "default": 30
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let seconds = arguments["seconds"].as_f64().unwrap_or(30.0).max(0.0);

        let payload = match self
            .ctx
            .client
            .request("audio", serde_json::json!({ "seconds": seconds }))
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Audio request failed");
                return Ok(ToolResult::json(
                    "",
                    serde_json::json!({
                        "transcripts": [],
                        "has_speech": false,
                        "error": e.to_string(),
                    }),
                ));
            }
        };

        let encoded = payload["audio"].as_str().unwrap_or("");
        let audio = match B64.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ToolResult::json(
                    "",
                    serde_json::json!({
                        "transcripts": [],
                        "has_speech": false,
                        "error": format!("undecodable audio payload: {e}"),
                    }),
                ));
            }
        };

        let duration_ms = payload["duration_ms"]
            .as_f64()
            .unwrap_or(audio.len() as f64 / BYTES_PER_MS);
        if duration_ms < MIN_AUDIO_MS {
            debug!(duration_ms, "Audio too short, skipping transcription");
            return Ok(ToolResult::json(
                "",
                serde_json::json!({ "transcripts": [], "has_speech": false }),
            ));
        }

        let text = match self.ctx.transcriber.transcribe(&audio).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Transcription failed");
                return Ok(ToolResult::json(
                    "",
                    serde_json::json!({
                        "transcripts": [],
                        "has_speech": false,
                        "error": e.to_string(),
                    }),
                ));
            }
        };

        if text.is_empty() {
            return Ok(ToolResult::json(
                "",
                serde_json::json!({ "transcripts": [], "has_speech": false }),
            ));
        }

        let now = Utc::now();
        self.ctx.session.lock().await.add_transcript(&text, now);

        Ok(ToolResult::json(
            "",
            serde_json::json!({
                "transcripts": [text],
                "has_speech": true,
                "timestamp": now.to_rfc3339(),
            }),
        ))
    }
}

// --- get_whiteboard ---

pub struct GetWhiteboard {
    ctx: Arc<ToolContext>,
}

impl GetWhiteboard {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetWhiteboard {
    fn name(&self) -> &str {
        "get_whiteboard"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Capture the student's whiteboard and, unless analyze=false, describe what is written on it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "analyze": {
                    "type": "boolean",
                    "description": "Run vision analysis on the snapshot",
                    "default": true
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let analyze = arguments["analyze"].as_bool().unwrap_or(true);

        let payload = match self
            .ctx
            .client
            .request("whiteboard", serde_json::Value::Null)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Whiteboard request failed");
                return Ok(ToolResult::json(
                    "",
                    serde_json::json!({ "has_content": false, "error": e.to_string() }),
                ));
            }
        };

        let image = payload["image"].as_str().map(str::to_string);
        let changed = payload["changed"].as_bool().unwrap_or(false);

        {
            let mut session = self.ctx.session.lock().await;
            if changed {
                session.last_whiteboard_change = Some(Utc::now());
            }
            if let Some(ref img) = image {
                session.whiteboard_snapshot = Some(img.clone());
            }
        }

        let mut result = serde_json::json!({
            "has_content": image.is_some(),
            "changed": changed,
        });

        if analyze {
            if let Some(ref img) = image {
                match self.ctx.vision.analyze(img, "whiteboard content").await {
                    Ok(analysis) => result["analysis"] = serde_json::json!(analysis),
                    Err(e) => {
                        warn!(error = %e, "Whiteboard analysis failed");
                        result["analysis_error"] = serde_json::json!(e.to_string());
                    }
                }
            }
        }

        Ok(ToolResult::json("", result))
    }
}

// --- get_camera_feed ---

pub struct GetCameraFeed {
    ctx: Arc<ToolContext>,
}

impl GetCameraFeed {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetCameraFeed {
    fn name(&self) -> &str {
        "get_camera_feed"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Check the student's camera. Reports availability, and optionally an impression of the student's expression."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "camera_id": {
                    "type": "string",
                    "description": "Which camera to sample",
                    "default": "student_face"
                },
                "analyze_emotion": {
                    "type": "boolean",
                    "default": false
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let camera_id = arguments["camera_id"].as_str().unwrap_or("student_face");
        let analyze_emotion = arguments["analyze_emotion"].as_bool().unwrap_or(false);

        let payload = match self
            .ctx
            .client
            .request("camera", serde_json::json!({ "camera_id": camera_id }))
            .await
        {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolResult::json(
                    "",
                    serde_json::json!({
                        "available": false,
                        "camera_id": camera_id,
                        "error": e.to_string(),
                    }),
                ));
            }
        };

        let image = payload["image"].as_str();
        let mut result = serde_json::json!({
            "available": image.is_some(),
            "camera_id": camera_id,
        });

        if analyze_emotion {
            if let Some(img) = image {
                match self
                    .ctx
                    .vision
                    .analyze(img, "the student's facial expression and posture")
                    .await
                {
                    Ok(analysis) => result["emotion_analysis"] = serde_json::json!(analysis),
                    Err(e) => result["analysis_error"] = serde_json::json!(e.to_string()),
                }
            }
        }

        Ok(ToolResult::json("", result))
    }
}

// --- get_student_profile ---

pub struct GetStudentProfile {
    ctx: Arc<ToolContext>,
}

impl GetStudentProfile {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetStudentProfile {
    fn name(&self) -> &str {
        "get_student_profile"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Read the persisted student model: competencies, pedagogy preferences, and current affective estimates."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "include_history": {
                    "type": "boolean",
                    "description": "Include past session history entries",
                    "default": false
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let include_history = arguments["include_history"].as_bool().unwrap_or(false);

        let model = self.ctx.student.lock().await.clone();
        let mut value = serde_json::to_value(&model)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "get_student_profile".into(),
                reason: e.to_string(),
            })?;

        if !include_history {
            if let Some(obj) = value.as_object_mut() {
                obj.remove("session_history");
            }
        }

        Ok(ToolResult::json("", value))
    }
}

// --- get_session_status ---

pub struct GetSessionStatus {
    ctx: Arc<ToolContext>,
}

impl GetSessionStatus {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetSessionStatus {
    fn name(&self) -> &str {
        "get_session_status"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Summarize the live session: silence duration, whiteboard activity, current student activity flags, and how long since the tutor last intervened."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let now = Utc::now();
        let session = self.ctx.session.lock().await;

        let last_intervention_seconds = session
            .last_intervention_time
            .map(|t| ((now - t).num_milliseconds() as f64 / 1000.0).max(0.0));

        Ok(ToolResult::json(
            "",
            serde_json::json!({
                "session_id": session.session_id,
                "student_id": session.student_id,
                "uptime_seconds": ((now - session.started_at).num_milliseconds() as f64 / 1000.0).max(0.0),
                "silence_duration": session.silence_duration(now),
                "whiteboard_unchanged_seconds": session.whiteboard_unchanged_duration(now),
                "student_is_speaking": session.student_is_speaking,
                "student_is_writing": session.student_is_writing,
                "transcript_count": session.transcripts.len(),
                "cycle_count": session.cycle_history.len(),
                "last_intervention_seconds": last_intervention_seconds,
            }),
        ))
    }
}

// --- get_observation_mode ---

pub struct GetObservationMode {
    ctx: Arc<ToolContext>,
}

impl GetObservationMode {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetObservationMode {
    fn name(&self) -> &str {
        "get_observation_mode"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Observation
    }

    fn description(&self) -> &str {
        "Read the current observation mode and cycle interval. Does not change anything."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let observation = self.ctx.observation.lock().await;
        Ok(ToolResult::json(
            "",
            serde_json::json!({
                "mode": observation.mode.as_str(),
                "interval_seconds": observation.interval_seconds,
            }),
        ))
    }
}
