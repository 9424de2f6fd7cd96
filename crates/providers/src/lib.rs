//! Remote model clients for oxtutor.
//!
//! Three concerns live here, all speaking OpenAI-compatible HTTP:
//! - [`OpenAiCompatProvider`] — the tool-calling reasoner behind the
//!   observation loop (OpenRouter by default).
//! - [`VisionDescriber`] — turns whiteboard snapshots into text the
//!   reasoner can work with.
//! - [`HttpTranscriber`] — speech-to-text against a whisper-style
//!   `/audio/transcriptions` endpoint.

pub mod openai_compat;
pub mod transcribe;
pub mod vision;

pub use openai_compat::OpenAiCompatProvider;
pub use transcribe::HttpTranscriber;
pub use vision::VisionDescriber;
