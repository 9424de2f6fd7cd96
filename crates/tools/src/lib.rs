//! Tool implementations for the observational tutor.
//!
//! Tools are the only way the reasoner touches the world. Three groups:
//! observation (read the session), action (speak, persist, draw), and
//! control (pace the loop, end the cycle). Every handler holds the
//! session's [`ToolContext`] and degrades failures into structured error
//! fields instead of propagating them.

pub mod action;
pub mod context;
pub mod control;
pub mod observation;

pub use context::{ObservationMode, ObservationState, ToolContext};
pub use control::END_CYCLE_TOOL;

use oxtutor_core::error::ToolError;
use oxtutor_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the full per-session tool registry, all sixteen tools bound to
/// one context. Registration order is what the reasoner sees in the
/// catalog, grouped observation, action, control.
pub fn session_registry(ctx: Arc<ToolContext>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(observation::GetAudioTranscript::new(ctx.clone())))?;
    registry.register(Box::new(observation::GetWhiteboard::new(ctx.clone())))?;
    registry.register(Box::new(observation::GetCameraFeed::new(ctx.clone())))?;
    registry.register(Box::new(observation::GetStudentProfile::new(ctx.clone())))?;
    registry.register(Box::new(observation::GetSessionStatus::new(ctx.clone())))?;
    registry.register(Box::new(observation::GetObservationMode::new(ctx.clone())))?;

    registry.register(Box::new(action::Speak::new(ctx.clone())))?;
    registry.register(Box::new(action::UpdateStudentModel::new(ctx.clone())))?;
    registry.register(Box::new(action::UpdateStudentProfile::new(ctx.clone())))?;
    registry.register(Box::new(action::SendVisualHint::new(ctx.clone())))?;
    registry.register(Box::new(action::ClearVisualHint::new(ctx.clone())))?;
    registry.register(Box::new(action::DrawOnWhiteboard::new(ctx.clone())))?;
    registry.register(Box::new(action::LogObservation::new(ctx.clone())))?;

    registry.register(Box::new(control::WaitForEvent::new(ctx.clone())))?;
    registry.register(Box::new(control::SetObservationMode::new(ctx)))?;
    registry.register(Box::new(control::EndObservationCycle))?;

    Ok(registry)
}

#[cfg(test)]
pub mod test_support {
    //! Stub collaborators and context plumbing shared by the handler tests.

    use super::*;
    use async_trait::async_trait;
    use oxtutor_bridge::{ClientHandle, PendingRequests, ServerMessage};
    use oxtutor_core::error::{CollaboratorError, StoreError};
    use oxtutor_core::{
        SessionState, StudentModel, StudentRepository, Transcriber, VisionAnalyzer,
    };
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{Mutex, mpsc};

    #[derive(Default)]
    pub struct RecordingRepo {
        pub saved: StdMutex<Vec<StudentModel>>,
    }

    #[async_trait]
    impl StudentRepository for RecordingRepo {
        async fn load(&self, _id: &str) -> Result<Option<StudentModel>, StoreError> {
            Ok(None)
        }
        async fn save(&self, model: &StudentModel) -> Result<(), StoreError> {
            self.saved.lock().unwrap().push(model.clone());
            Ok(())
        }
        async fn create_default(&self, id: &str) -> Result<StudentModel, StoreError> {
            Ok(StudentModel::new(id))
        }
        async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    pub struct FixedTranscriber(pub String);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedVision(pub String);

    #[async_trait]
    impl VisionAnalyzer for FixedVision {
        async fn analyze(&self, _image: &str, _ctx: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    pub struct TestHarness {
        pub ctx: Arc<ToolContext>,
        pub outbound: mpsc::Receiver<ServerMessage>,
        pub repo: Arc<RecordingRepo>,
    }

    pub fn harness() -> TestHarness {
        let (tx, rx) = mpsc::channel(32);
        let repo = Arc::new(RecordingRepo::default());
        let ctx = Arc::new(ToolContext {
            session: Arc::new(Mutex::new(SessionState::new("sess-1", "alice"))),
            student: Arc::new(Mutex::new(StudentModel::new("alice"))),
            repository: repo.clone(),
            transcriber: Arc::new(FixedTranscriber("two plus two".into())),
            vision: Arc::new(FixedVision("student wrote 2x+3=7".into())),
            client: ClientHandle::new(tx, Arc::new(PendingRequests::new())),
            observation: Arc::new(Mutex::new(ObservationState::new(5.0))),
        });
        TestHarness {
            ctx,
            outbound: rx,
            repo,
        }
    }

    /// Parse a handler's JSON output.
    pub fn output_json(result: &oxtutor_core::ToolResult) -> serde_json::Value {
        serde_json::from_str(&result.output).unwrap()
    }
}
