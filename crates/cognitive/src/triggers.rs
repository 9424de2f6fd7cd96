//! Trigger detection — when to wake the observation loop early.
//!
//! Stateless over the session: every evaluation looks only at the current
//! `SessionState` and (optionally) a fresh visual-change score from the
//! gateway's frame handler.

use crate::pedagogy;
use chrono::{DateTime, Utc};
use oxtutor_core::SessionState;

/// Transcript window scanned for an explicit question.
const QUESTION_WINDOW_SECONDS: f64 = 5.0;

/// Wider transcript window fed to the stuck/confusion heuristics.
const HEURISTIC_WINDOW_SECONDS: f64 = 30.0;

/// Confusion score at which the loop deserves an early wake.
const CONFUSION_TRIGGER_SCORE: f64 = 0.5;

/// The outcome of one trigger evaluation.
#[derive(Debug, Clone)]
pub struct TriggerDecision {
    pub triggered: bool,
    pub reasons: Vec<String>,
}

/// Decides whether the session deserves an immediate reasoning cycle.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    /// Silence longer than this (seconds) fires a trigger.
    pub silence_threshold: f64,
    /// Frame-diff scores above this count as a significant visual change.
    pub visual_change_threshold: f64,
}

impl TriggerDetector {
    pub fn new(silence_threshold: f64, visual_change_threshold: f64) -> Self {
        Self {
            silence_threshold,
            visual_change_threshold,
        }
    }

    /// Evaluate the session at `now`. `visual_change` is the most recent
    /// frame-diff score, when a frame just arrived.
    pub fn evaluate(
        &self,
        session: &SessionState,
        visual_change: Option<f64>,
        now: DateTime<Utc>,
    ) -> TriggerDecision {
        let mut reasons = Vec::new();

        if session.cycle_history.is_empty() {
            reasons.push("first_observation".to_string());
        }

        // Silence only counts once the student has spoken at least once.
        if session.last_speech_time.is_some() {
            let silence = session.silence_duration(now);
            if silence > self.silence_threshold {
                reasons.push(format!("extended_silence:{silence:.1}s"));
            }
        }

        if let Some(score) = visual_change {
            if score > self.visual_change_threshold {
                reasons.push(format!("visual_change:{score:.2}"));
            }
        }

        let recent: String = session
            .recent_transcripts(QUESTION_WINDOW_SECONDS, now)
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if !recent.is_empty() && pedagogy::detect_question(&recent) {
            reasons.push("explicit_question".to_string());
        }

        let window: String = session
            .recent_transcripts(HEURISTIC_WINDOW_SECONDS, now)
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let stuck = pedagogy::detect_stuck_pattern(
            &window,
            session.silence_duration(now),
            session.whiteboard_unchanged_duration(now),
        );
        if stuck.is_stuck {
            reasons.push(format!("stuck_pattern:{:.2}", stuck.score));
        }

        let confusion = pedagogy::assess_confusion(&window);
        if confusion.score >= CONFUSION_TRIGGER_SCORE {
            reasons.push("confusion".to_string());
        }

        TriggerDecision {
            triggered: !reasons.is_empty(),
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use oxtutor_core::{CycleRecord, NextAction};

    fn detector() -> TriggerDetector {
        TriggerDetector::new(3.0, 0.1)
    }

    fn session_with_history() -> SessionState {
        let mut s = SessionState::new("s1", "alice");
        s.add_cycle_record(CycleRecord {
            cycle_number: 1,
            tools_called: vec![],
            final_action: Some(NextAction::Wait),
            reasoning: None,
            spoke_to_student: false,
            spoken_text: None,
            timestamp: Utc::now(),
        });
        s
    }

    #[test]
    fn first_run_always_triggers() {
        let session = SessionState::new("s1", "alice");
        let decision = detector().evaluate(&session, None, Utc::now());
        assert!(decision.triggered);
        assert_eq!(decision.reasons, vec!["first_observation"]);
    }

    #[test]
    fn silence_past_threshold_triggers() {
        let now = Utc::now();
        let mut session = session_with_history();
        session.last_speech_time = Some(now - Duration::seconds(10));

        let decision = detector().evaluate(&session, None, now);
        assert!(decision.triggered);
        assert!(decision.reasons[0].starts_with("extended_silence"));
    }

    #[test]
    fn silence_needs_prior_speech() {
        let session = session_with_history();
        let decision = detector().evaluate(&session, None, Utc::now());
        assert!(!decision.triggered);
    }

    #[test]
    fn visual_change_above_threshold_triggers() {
        let session = session_with_history();
        let decision = detector().evaluate(&session, Some(0.4), Utc::now());
        assert!(decision.triggered);
        assert!(decision.reasons[0].starts_with("visual_change"));

        let decision = detector().evaluate(&session, Some(0.05), Utc::now());
        assert!(!decision.triggered);
    }

    #[test]
    fn recent_question_triggers() {
        let now = Utc::now();
        let mut session = session_with_history();
        session.add_transcript("how do I factor this", now - Duration::seconds(2));
        // Speech two seconds ago, so silence does not fire.
        let decision = detector().evaluate(&session, None, now);
        assert!(decision.triggered);
        assert!(decision.reasons.contains(&"explicit_question".to_string()));
    }

    #[test]
    fn stuck_student_triggers() {
        let now = Utc::now();
        let mut session = session_with_history();
        session.add_transcript("I'm stuck on this one", now - Duration::seconds(2));
        session.last_whiteboard_change = Some(now - Duration::seconds(20));

        let decision = detector().evaluate(&session, None, now);
        assert!(decision.triggered);
        assert!(
            decision
                .reasons
                .iter()
                .any(|r| r.starts_with("stuck_pattern"))
        );
    }

    #[test]
    fn repeated_confusion_triggers() {
        let now = Utc::now();
        let mut session = session_with_history();
        session.add_transcript("I don't get this", now - Duration::seconds(10));
        session.add_transcript("it is so confusing", now - Duration::seconds(2));

        let decision = detector().evaluate(&session, None, now);
        assert!(decision.triggered);
        assert!(decision.reasons.contains(&"confusion".to_string()));
    }

    #[test]
    fn old_question_is_out_of_window() {
        let now = Utc::now();
        let mut session = session_with_history();
        session.add_transcript("how do I factor this", now - Duration::seconds(30));
        session.last_speech_time = Some(now - Duration::seconds(1));

        let decision = detector().evaluate(&session, None, now);
        assert!(!decision.triggered);
    }
}
