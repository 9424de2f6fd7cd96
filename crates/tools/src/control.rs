//! Control tools — how the reasoner steers its own observation cadence.

use crate::context::{ObservationMode, ToolContext};
use async_trait::async_trait;
use chrono::Utc;
use oxtutor_core::error::ToolError;
use oxtutor_core::tool::{Tool, ToolGroup, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the tool that marks the end of a reasoning cycle. The exchange
/// treats a call to it as terminal.
pub const END_CYCLE_TOOL: &str = "end_observation_cycle";

const EVENT_NAMES: [&str; 4] = ["speech", "silence", "whiteboard_change", "any_activity"];
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long the student must be quiet for a requested "silence" event to
/// count as settled.
const SILENCE_EVENT_SECONDS: f64 = 2.0;

// --- wait_for_event ---

pub struct WaitForEvent {
    ctx: Arc<ToolContext>,
}

impl WaitForEvent {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    /// Check whether any requested event currently holds.
    async fn check(
        &self,
        events: &[String],
        baseline_transcripts: usize,
        baseline_whiteboard: Option<chrono::DateTime<Utc>>,
    ) -> Option<String> {
        let now = Utc::now();
        let session = self.ctx.session.lock().await;

        let spoke = session.student_is_speaking || session.transcripts.len() > baseline_transcripts;
        let whiteboard_changed =
            session.student_is_writing || session.last_whiteboard_change != baseline_whiteboard;

        for event in events {
            let fired = match event.as_str() {
                "speech" => spoke,
                "silence" => {
                    !session.student_is_speaking
                        && session.silence_duration(now) >= SILENCE_EVENT_SECONDS
                }
                "whiteboard_change" => whiteboard_changed,
                "any_activity" => spoke || whiteboard_changed,
                _ => false,
            };
            if fired {
                return Some(event.clone());
            }
        }
        None
    }
}

#[async_trait]
impl Tool for WaitForEvent {
    fn name(&self) -> &str {
        "wait_for_event"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Control
    }

    fn description(&self) -> &str {
        "Pause observation until something happens: the student speaks, goes quiet, changes the whiteboard, or any activity. Use min_wait_seconds to guarantee a minimum pause."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "events": {
                    "type": "array",
                    "items": { "type": "string", "enum": EVENT_NAMES },
                    "minItems": 1
                },
                "timeout_seconds": { "type": "number", "default": 30 },
                "min_wait_seconds": { "type": "number", "default": 0 }
            },
            "required": ["events"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let events: Vec<String> = arguments["events"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if events.is_empty() {
            return Ok(ToolResult::error("", "'events' must be a non-empty array"));
        }
        if let Some(bad) = events.iter().find(|e| !EVENT_NAMES.contains(&e.as_str())) {
            return Ok(ToolResult::error(
                "",
                format!("Unknown event '{bad}', expected one of {EVENT_NAMES:?}"),
            ));
        }

        let timeout = arguments["timeout_seconds"].as_f64().unwrap_or(30.0).max(0.0);
        let min_wait = arguments["min_wait_seconds"].as_f64().unwrap_or(0.0).max(0.0);

        let start = tokio::time::Instant::now();
        let (baseline_transcripts, baseline_whiteboard) = {
            let session = self.ctx.session.lock().await;
            (session.transcripts.len(), session.last_whiteboard_change)
        };

        // The minimum wait applies even when an event already holds.
        if min_wait > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(min_wait)).await;
        }

        let deadline = start + Duration::from_secs_f64(timeout.max(min_wait));
        let fired = loop {
            if let Some(event) = self
                .check(&events, baseline_transcripts, baseline_whiteboard)
                .await
            {
                break Some(event);
            }
            if tokio::time::Instant::now() >= deadline {
                break None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        let waited = start.elapsed().as_secs_f64();
        debug!(?fired, waited, "wait_for_event finished");

        Ok(ToolResult::json(
            "",
            serde_json::json!({
                "event": fired,
                "timed_out": fired.is_none(),
                "waited_seconds": waited,
            }),
        ))
    }
}

// --- set_observation_mode ---

pub struct SetObservationMode {
    ctx: Arc<ToolContext>,
}

impl SetObservationMode {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for SetObservationMode {
    fn name(&self) -> &str {
        "set_observation_mode"
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Control
    }

    fn description(&self) -> &str {
        "Change the observation cadence: active (3s), passive (10s), or intervention (1s). An explicit interval_seconds overrides the mode default."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "enum": ["active", "passive", "intervention"]
                },
                "interval_seconds": {
                    "type": "number",
                    "minimum": 0.5
                }
            },
            "required": ["mode"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let mode_str = arguments["mode"].as_str().unwrap_or("");
        let Some(mode) = ObservationMode::parse(mode_str) else {
            return Ok(ToolResult::error(
                "",
                format!("Invalid mode '{mode_str}', expected active, passive, or intervention"),
            ));
        };

        let interval = arguments["interval_seconds"]
            .as_f64()
            .map(|v| v.max(0.5))
            .unwrap_or_else(|| mode.default_interval());

        {
            let mut observation = self.ctx.observation.lock().await;
            observation.mode = mode;
            observation.interval_seconds = interval;
        }
        info!(mode = mode.as_str(), interval, "Observation mode changed");

        Ok(ToolResult::json(
            "",
            serde_json::json!({ "mode": mode.as_str(), "interval_seconds": interval }),
        ))
    }
}

// --- end_observation_cycle ---

/// Pure echo: returns the declared next action and reasoning. The
/// exchange recognizes the name and stops looping; the OODA loop reads
/// the echoed fields out of the cycle's invocation list.
pub struct EndObservationCycle;

#[async_trait]
impl Tool for EndObservationCycle {
    fn name(&self) -> &str {
        END_CYCLE_TOOL
    }

    fn group(&self) -> ToolGroup {
        ToolGroup::Control
    }

    fn description(&self) -> &str {
        "Finish this observation cycle. Declare what should happen next (wait, speak, or observe_again) and why."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "next_action": {
                    "type": "string",
                    "enum": ["wait", "speak", "observe_again"],
                    "default": "wait"
                },
                "reasoning": { "type": "string" }
            },
            "required": ["next_action", "reasoning"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let next_action = arguments["next_action"].as_str().unwrap_or("wait");
        if oxtutor_core::NextAction::parse(next_action).is_none() {
            return Ok(ToolResult::error(
                "",
                format!("Invalid next_action '{next_action}', expected wait, speak, or observe_again"),
            ));
        }
        let reasoning = arguments["reasoning"].as_str().unwrap_or("");

        Ok(ToolResult::json(
            "",
            serde_json::json!({
                "cycle_ended": true,
                "next_action": next_action,
                "reasoning": reasoning,
            }),
        ))
    }
}
