//! Collaborator traits — the stable interfaces to the I/O subsystems the
//! cognitive core depends on: persistence, speech-to-text, and vision.
//!
//! These are single-purpose wrappers; implementations live in the
//! `oxtutor-store` and `oxtutor-providers` crates. All of them are treated
//! as slow and fallible: callers degrade, they do not crash.

use crate::error::{CollaboratorError, StoreError};
use crate::student::StudentModel;
use async_trait::async_trait;

/// Persistence for long-lived student models. Keyed by student id, one
/// record per student, last-write-wins.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Load a student model, or None if absent.
    async fn load(&self, student_id: &str) -> std::result::Result<Option<StudentModel>, StoreError>;

    /// Save (upsert) a student model.
    async fn save(&self, model: &StudentModel) -> std::result::Result<(), StoreError>;

    /// Create and persist a default model for a new student.
    async fn create_default(&self, student_id: &str)
    -> std::result::Result<StudentModel, StoreError>;

    /// Delete a student model. Returns whether a record was removed.
    async fn delete(&self, student_id: &str) -> std::result::Result<bool, StoreError>;

    /// All known student ids.
    async fn list_ids(&self) -> std::result::Result<Vec<String>, StoreError>;
}

/// Speech-to-text. Potentially slow; returns an empty string when nothing
/// intelligible was heard.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> std::result::Result<String, CollaboratorError>;
}

/// Vision analysis of whiteboard snapshots. Fallible; callers attach the
/// failure as an `analysis_error` field rather than failing the handler.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyze a base64-encoded image. `context` describes what the image
    /// is (e.g. "whiteboard content") and any prior analysis summary.
    async fn analyze(
        &self,
        image_base64: &str,
        context: &str,
    ) -> std::result::Result<String, CollaboratorError>;
}
