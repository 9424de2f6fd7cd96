//! Shared per-session state handed to every tool handler.

use oxtutor_bridge::ClientHandle;
use oxtutor_core::{SessionState, StudentModel, StudentRepository, Transcriber, VisionAnalyzer};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How aggressively the loop observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationMode {
    Active,
    Passive,
    Intervention,
}

impl ObservationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "passive" => Some(Self::Passive),
            "intervention" => Some(Self::Intervention),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
            Self::Intervention => "intervention",
        }
    }

    /// Seconds between cycles when no explicit interval is given.
    pub fn default_interval(&self) -> f64 {
        match self {
            Self::Active => 3.0,
            Self::Passive => 10.0,
            Self::Intervention => 1.0,
        }
    }
}

/// The loop cadence, mutated mid-cycle by `set_observation_mode` and read
/// by the loop when computing the next sleep.
#[derive(Debug, Clone)]
pub struct ObservationState {
    pub mode: ObservationMode,
    pub interval_seconds: f64,
}

impl ObservationState {
    pub fn new(interval_seconds: f64) -> Self {
        Self {
            mode: ObservationMode::Active,
            interval_seconds,
        }
    }
}

/// Everything a tool handler can touch, scoped to one session.
///
/// Constructed explicitly at session start; no globals. Sessions never
/// share a context, so all cross-tool coordination happens through these
/// mutexes within a single session's task.
pub struct ToolContext {
    pub session: Arc<Mutex<SessionState>>,
    pub student: Arc<Mutex<StudentModel>>,
    pub repository: Arc<dyn StudentRepository>,
    pub transcriber: Arc<dyn Transcriber>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub client: ClientHandle,
    pub observation: Arc<Mutex<ObservationState>>,
}

impl ToolContext {
    /// Persist the current student model, returning a printable error on
    /// failure. Handlers attach it as a `persist_error` field.
    pub async fn persist_student(&self) -> Option<String> {
        let model = self.student.lock().await.clone();
        match self.repository.save(&model).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(student_id = %model.student_id, error = %e, "Failed to persist student model");
                Some(e.to_string())
            }
        }
    }
}
