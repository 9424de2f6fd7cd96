//! Session state — the working memory of one tutoring session.
//!
//! Created at session start, mutated by tool handlers and the OODA loop,
//! discarded at session end. Owned exclusively by the active session: no
//! cross-session sharing, no global registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single transcript entry with its capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// What the reasoner declared it wants to happen after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Wait,
    Speak,
    ObserveAgain,
}

impl NextAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wait" => Some(Self::Wait),
            "speak" => Some(Self::Speak),
            "observe_again" => Some(Self::ObserveAgain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Speak => "speak",
            Self::ObserveAgain => "observe_again",
        }
    }
}

/// The record of one completed reasoning cycle — the session's
/// "internal monologue" history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Cycle sequence number, starting at 1.
    pub cycle_number: u64,

    /// Tool names invoked during the cycle, in invocation order.
    /// Duplicates allowed.
    pub tools_called: Vec<String>,

    /// What the termination tool declared, if it fired.
    pub final_action: Option<NextAction>,

    /// The reasoner's stated rationale, if the termination tool fired.
    pub reasoning: Option<String>,

    /// Whether a speak action occurred during the cycle.
    pub spoke_to_student: bool,

    /// The text spoken, if any.
    pub spoken_text: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// Working memory for the current tutoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub student_id: String,

    /// Time-ordered transcript entries. Insertion order preserved, not
    /// deduplicated; timestamps are non-decreasing at insertion time but
    /// never globally re-sorted.
    pub transcripts: Vec<TranscriptEntry>,

    /// Latest whiteboard snapshot (base64 PNG), if the client sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whiteboard_snapshot: Option<String>,

    pub last_speech_time: Option<DateTime<Utc>>,
    pub last_whiteboard_change: Option<DateTime<Utc>>,
    pub last_intervention_time: Option<DateTime<Utc>>,

    pub student_is_speaking: bool,
    pub student_is_writing: bool,

    /// History of past reasoning cycles.
    pub cycle_history: Vec<CycleRecord>,

    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            student_id: student_id.into(),
            transcripts: Vec::new(),
            whiteboard_snapshot: None,
            last_speech_time: None,
            last_whiteboard_change: None,
            last_intervention_time: None,
            student_is_speaking: false,
            student_is_writing: false,
            cycle_history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Append a transcript entry and advance the last-speech clock.
    ///
    /// Timestamps within the buffer must be non-decreasing at insert time;
    /// an out-of-order timestamp is clamped to the previous entry's.
    pub fn add_transcript(&mut self, text: impl Into<String>, timestamp: DateTime<Utc>) {
        let timestamp = match self.transcripts.last() {
            Some(prev) if timestamp < prev.timestamp => prev.timestamp,
            _ => timestamp,
        };
        self.transcripts.push(TranscriptEntry {
            text: text.into(),
            timestamp,
        });
        self.last_speech_time = Some(timestamp);
    }

    /// Transcripts captured within the last `seconds` before `now`.
    pub fn recent_transcripts(&self, seconds: f64, now: DateTime<Utc>) -> Vec<&TranscriptEntry> {
        let cutoff = now - chrono::Duration::milliseconds((seconds * 1000.0) as i64);
        self.transcripts
            .iter()
            .filter(|e| e.timestamp > cutoff)
            .collect()
    }

    /// Seconds since the student last spoke. 0.0 if they have not spoken
    /// yet this session — a fresh session is not "silent".
    pub fn silence_duration(&self, now: DateTime<Utc>) -> f64 {
        match self.last_speech_time {
            Some(t) => ((now - t).num_milliseconds() as f64 / 1000.0).max(0.0),
            None => 0.0,
        }
    }

    /// Seconds since the whiteboard last changed, if ever.
    pub fn whiteboard_unchanged_duration(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_whiteboard_change
            .map(|t| ((now - t).num_milliseconds() as f64 / 1000.0).max(0.0))
    }

    pub fn add_cycle_record(&mut self, record: CycleRecord) {
        self.cycle_history.push(record);
    }
}
