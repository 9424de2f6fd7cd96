//! # oxtutor Core
//!
//! Domain types, traits, and error definitions for the oxtutor
//! observational AI tutor. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod session;
pub mod student;
pub mod collaborators;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolGroup, ToolRegistry, ToolResult};
pub use session::{CycleRecord, NextAction, SessionState, TranscriptEntry};
pub use student::{
    AffectiveState, CompetencyLevel, HintPreference, LearningStyle, PedagogyProfile,
    SessionHistoryEntry, StudentModel,
};
pub use collaborators::{StudentRepository, Transcriber, VisionAnalyzer};
