//! Action tools — the ways the tutor acts on the session.
//!
//! Speaking, persisting model updates, and pushing visuals to the client.
//! Profile mutations validate field-by-field: a bad enum value errors for
//! that field only, the rest still apply and persist.

use crate::context::ToolContext;
use async_trait::async_trait;
use chrono::Utc;
use oxtutor_bridge::ServerMessage;
use oxtutor_core::error::ToolError;
use oxtutor_core::student::{CompetencyLevel, HintPreference, LearningStyle, clamp_unit};
use oxtutor_core::tool::{Tool, ToolGroup, ToolResult};
use std::sync::Arc;
use tracing::{info, warn};

const TONES: [&str; 4] = ["encouraging", "neutral", "questioning", "excited"];
const HINT_TYPES: [&str; 4] = ["highlight", "diagram", "formula", "example"];
const HINT_POSITIONS: [&str; 3] = ["corner", "center", "near_problem"];
const DRAW_ACTIONS: [&str; 6] = [
    "draw_arrow",
    "circle_area",
    "write_text",
    "draw_diagram",
    "highlight",
    "clear",
];
const LOG_CATEGORIES: [&str; 4] = ["hypothesis", "decision", "observation", "error"];

// --- speak ---

pub struct Speak {
    ctx: Arc<ToolContext>,
}

impl Speak {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for Speak {
    fn name(&self) -> &str {
        "speak"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Say something to the student out loud. Use sparingly: interrupting a student who is working productively does more harm than staying quiet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "What to say"
                },
                "tone": {
                    "type": "string",
                    "enum": TONES,
                    "default": "neutral"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let Some(text) = arguments["text"].as_str().filter(|t| !t.is_empty()) else {
            return Ok(ToolResult::error("", "Missing required 'text' argument"));
        };
        let tone = arguments["tone"].as_str().unwrap_or("neutral");
        if !TONES.contains(&tone) {
            return Ok(ToolResult::error(
                "",
                format!("Invalid tone '{tone}', expected one of {TONES:?}"),
            ));
        }

        if let Err(e) = self
            .ctx
            .client
            .notify(ServerMessage::AiResponse {
                text: text.to_string(),
                tone: tone.to_string(),
            })
            .await
        {
            warn!(error = %e, "Failed to deliver speech");
            return Ok(ToolResult::error("", e.to_string()));
        }

        self.ctx.session.lock().await.last_intervention_time = Some(Utc::now());
        info!(tone, "Tutor spoke: {text}");

        Ok(ToolResult::json(
            "",
            serde_json::json!({ "spoken": true, "text": text, "tone": tone }),
        ))
    }
}

// --- update_student_model ---

pub struct UpdateStudentModel {
    ctx: Arc<ToolContext>,
}

impl UpdateStudentModel {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for UpdateStudentModel {
    fn name(&self) -> &str {
        "update_student_model"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Adjust the running estimate of the student's understanding, frustration, and engagement by bounded deltas, record a note, or mark a concept's mastery level."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "understanding_delta": { "type": "number", "minimum": -1, "maximum": 1 },
                "frustration_delta": { "type": "number", "minimum": -1, "maximum": 1 },
                "engagement_delta": { "type": "number", "minimum": -1, "maximum": 1 },
                "note": { "type": "string" },
                "concept_mastery": {
                    "type": "object",
                    "description": "Topic name to one of: unknown, struggling, mastered",
                    "additionalProperties": { "type": "string" }
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let mut applied: Vec<String> = Vec::new();
        let mut errors = serde_json::Map::new();

        {
            let mut model = self.ctx.student.lock().await;

            let understanding = arguments["understanding_delta"].as_f64();
            let frustration = arguments["frustration_delta"].as_f64();
            let engagement = arguments["engagement_delta"].as_f64();
            if understanding.is_some() || frustration.is_some() || engagement.is_some() {
                model
                    .affective_state
                    .apply_deltas(understanding, frustration, engagement);
                for (name, present) in [
                    ("understanding_delta", understanding.is_some()),
                    ("frustration_delta", frustration.is_some()),
                    ("engagement_delta", engagement.is_some()),
                ] {
                    if present {
                        applied.push(name.to_string());
                    }
                }
            }

            if let Some(note) = arguments["note"].as_str().filter(|n| !n.is_empty()) {
                model.notes.push(note.to_string());
                applied.push("note".into());
            }

            if let Some(mastery) = arguments["concept_mastery"].as_object() {
                for (topic, level) in mastery {
                    let level_str = level.as_str().unwrap_or("");
                    match level_str {
                        "unknown" => model.update_competency(topic, CompetencyLevel::Unknown),
                        "struggling" => model.update_competency(topic, CompetencyLevel::Struggling),
                        "mastered" => model.update_competency(topic, CompetencyLevel::Mastered),
                        other => {
                            errors.insert(
                                format!("concept_mastery.{topic}"),
                                serde_json::json!(format!("invalid mastery level '{other}'")),
                            );
                            continue;
                        }
                    }
                    applied.push(format!("concept_mastery.{topic}"));
                }
            }

            model.touch();
        }

        let mut result = serde_json::json!({
            "applied": applied,
            "affective_state": serde_json::to_value(
                &self.ctx.student.lock().await.affective_state
            ).unwrap_or_default(),
        });
        if !errors.is_empty() {
            result["errors"] = serde_json::Value::Object(errors);
        }
        if let Some(persist_error) = self.ctx.persist_student().await {
            result["persist_error"] = serde_json::json!(persist_error);
        }

        Ok(ToolResult::json("", result))
    }
}

// --- update_student_profile ---

pub struct UpdateStudentProfile {
    ctx: Arc<ToolContext>,
}

impl UpdateStudentProfile {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for UpdateStudentProfile {
    fn name(&self) -> &str {
        "update_student_profile"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Update the student's long-term pedagogy preferences: learning style, patience, intervention delay, hint detail, encouragement frequency."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "learning_style": {
                    "type": "string",
                    "enum": ["visual", "auditory", "reading_writing", "kinesthetic"]
                },
                "patience_level": { "type": "number", "minimum": 0, "maximum": 1 },
                "optimal_intervention_delay": { "type": "number", "minimum": 0 },
                "hint_preference": {
                    "type": "string",
                    "enum": ["minimal", "moderate", "detailed"]
                },
                "encouragement_frequency": { "type": "number", "minimum": 0, "maximum": 1 }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let mut applied: Vec<String> = Vec::new();
        let mut errors = serde_json::Map::new();

        {
            let mut model = self.ctx.student.lock().await;
            let profile = &mut model.pedagogy_profile;

            if let Some(style) = arguments["learning_style"].as_str() {
                match LearningStyle::parse(style) {
                    Some(s) => {
                        profile.preferred_learning_style = s;
                        applied.push("learning_style".into());
                    }
                    None => {
                        errors.insert(
                            "learning_style".into(),
                            serde_json::json!(format!("invalid learning style '{style}'")),
                        );
                    }
                }
            }

            if let Some(v) = arguments["patience_level"].as_f64() {
                profile.patience_level = clamp_unit(v);
                applied.push("patience_level".into());
            }

            if let Some(v) = arguments["optimal_intervention_delay"].as_f64() {
                profile.optimal_intervention_delay = v.max(0.0);
                applied.push("optimal_intervention_delay".into());
            }

            if let Some(pref) = arguments["hint_preference"].as_str() {
                match HintPreference::parse(pref) {
                    Some(p) => {
                        profile.hint_preference = p;
                        applied.push("hint_preference".into());
                    }
                    None => {
                        errors.insert(
                            "hint_preference".into(),
                            serde_json::json!(format!("invalid hint preference '{pref}'")),
                        );
                    }
                }
            }

            if let Some(v) = arguments["encouragement_frequency"].as_f64() {
                profile.encouragement_frequency = clamp_unit(v);
                applied.push("encouragement_frequency".into());
            }

            model.touch();
        }

        let mut result = serde_json::json!({
            "applied": applied,
            "profile": serde_json::to_value(
                &self.ctx.student.lock().await.pedagogy_profile
            ).unwrap_or_default(),
        });
        if !errors.is_empty() {
            result["errors"] = serde_json::Value::Object(errors);
        }
        if let Some(persist_error) = self.ctx.persist_student().await {
            result["persist_error"] = serde_json::json!(persist_error);
        }

        Ok(ToolResult::json("", result))
    }
}

// --- send_visual_hint ---

pub struct SendVisualHint {
    ctx: Arc<ToolContext>,
}

impl SendVisualHint {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for SendVisualHint {
    fn name(&self) -> &str {
        "send_visual_hint"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Display a hint overlay on the student's screen without speaking."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "hint_type": { "type": "string", "enum": HINT_TYPES },
                "content": { "type": "string" },
                "position": {
                    "type": "string",
                    "enum": HINT_POSITIONS,
                    "default": "corner"
                }
            },
            "required": ["hint_type", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let hint_type = arguments["hint_type"].as_str().unwrap_or("");
        if !HINT_TYPES.contains(&hint_type) {
            return Ok(ToolResult::error(
                "",
                format!("Invalid hint_type '{hint_type}', expected one of {HINT_TYPES:?}"),
            ));
        }
        let Some(content) = arguments["content"].as_str().filter(|c| !c.is_empty()) else {
            return Ok(ToolResult::error("", "Missing required 'content' argument"));
        };
        let position = arguments["position"].as_str().unwrap_or("corner");
        if !HINT_POSITIONS.contains(&position) {
            return Ok(ToolResult::error(
                "",
                format!("Invalid position '{position}', expected one of {HINT_POSITIONS:?}"),
            ));
        }

        if let Err(e) = self
            .ctx
            .client
            .notify(ServerMessage::VisualHint {
                hint_type: hint_type.to_string(),
                content: content.to_string(),
                position: position.to_string(),
            })
            .await
        {
            return Ok(ToolResult::error("", e.to_string()));
        }

        self.ctx.session.lock().await.last_intervention_time = Some(Utc::now());

        Ok(ToolResult::json(
            "",
            serde_json::json!({ "displayed": true, "hint_type": hint_type, "position": position }),
        ))
    }
}

// --- clear_visual_hint ---

pub struct ClearVisualHint {
    ctx: Arc<ToolContext>,
}

impl ClearVisualHint {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ClearVisualHint {
    fn name(&self) -> &str {
        "clear_visual_hint"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Remove any visual hint currently shown on the student's screen."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        if let Err(e) = self.ctx.client.notify(ServerMessage::ClearVisualHint).await {
            return Ok(ToolResult::error("", e.to_string()));
        }
        Ok(ToolResult::json("", serde_json::json!({ "cleared": true })))
    }
}

// --- draw_on_whiteboard ---

pub struct DrawOnWhiteboard {
    ctx: Arc<ToolContext>,
}

impl DrawOnWhiteboard {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for DrawOnWhiteboard {
    fn name(&self) -> &str {
        "draw_on_whiteboard"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Draw on the shared whiteboard: arrows, circles, text, small diagrams, highlights, or a clear."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": DRAW_ACTIONS },
                "content": { "type": "string" },
                "position": {
                    "type": "object",
                    "properties": {
                        "x": { "type": "number", "default": 50 },
                        "y": { "type": "number", "default": 50 }
                    }
                },
                "color": { "type": "string", "default": "blue" }
            },
            "required": ["action"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let action = arguments["action"].as_str().unwrap_or("");
        if !DRAW_ACTIONS.contains(&action) {
            return Ok(ToolResult::error(
                "",
                format!("Invalid action '{action}', expected one of {DRAW_ACTIONS:?}"),
            ));
        }
        let content = arguments["content"].as_str().unwrap_or("");
        let x = arguments["position"]["x"].as_f64().unwrap_or(50.0);
        let y = arguments["position"]["y"].as_f64().unwrap_or(50.0);
        let color = arguments["color"].as_str().unwrap_or("blue");

        let instructions = serde_json::json!({
            "action": action,
            "content": content,
            "position": { "x": x, "y": y },
            "color": color,
        });

        if let Err(e) = self
            .ctx
            .client
            .notify(ServerMessage::WhiteboardDraw {
                instructions: instructions.clone(),
            })
            .await
        {
            return Ok(ToolResult::error("", e.to_string()));
        }

        self.ctx.session.lock().await.last_intervention_time = Some(Utc::now());

        Ok(ToolResult::json(
            "",
            serde_json::json!({ "drawn": true, "instructions": instructions }),
        ))
    }
}

// --- log_observation ---

pub struct LogObservation {
    ctx: Arc<ToolContext>,
}

impl LogObservation {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for LogObservation {
    fn name(&self) -> &str {
        "log_observation"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Action
    }

    fn description(&self) -> &str {
        "Record an internal observation, hypothesis, or decision. Visible in debug views, never shown to the student."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "enum": LOG_CATEGORIES },
                "message": { "type": "string" }
            },
            "required": ["category", "message"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let category = arguments["category"].as_str().unwrap_or("");
        if !LOG_CATEGORIES.contains(&category) {
            return Ok(ToolResult::error(
                "",
                format!("Invalid category '{category}', expected one of {LOG_CATEGORIES:?}"),
            ));
        }
        let Some(message) = arguments["message"].as_str().filter(|m| !m.is_empty()) else {
            return Ok(ToolResult::error("", "Missing required 'message' argument"));
        };

        info!(category, "Observation: {message}");

        // Best-effort: debug surfaces are optional.
        let _ = self
            .ctx
            .client
            .notify(ServerMessage::Debug {
                message: format!("[{category}] {message}"),
            })
            .await;

        Ok(ToolResult::json(
            "",
            serde_json::json!({ "logged": true, "category": category }),
        ))
    }
}
