//! Student model — the long-lived, per-student pedagogical profile.
//!
//! Loaded at session start, saved through the repository whenever a tool
//! mutates it, independent lifecycle from SessionState.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Student's competency in one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetencyLevel {
    Unknown,
    Struggling,
    Mastered,
}

/// Student's preferred learning style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    ReadingWriting,
    Kinesthetic,
}

impl LearningStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "visual" => Some(Self::Visual),
            "auditory" => Some(Self::Auditory),
            "reading_writing" => Some(Self::ReadingWriting),
            "kinesthetic" => Some(Self::Kinesthetic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::ReadingWriting => "reading_writing",
            Self::Kinesthetic => "kinesthetic",
        }
    }
}

/// How detailed hints should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintPreference {
    Minimal,
    Moderate,
    Detailed,
}

impl HintPreference {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimal" => Some(Self::Minimal),
            "moderate" => Some(Self::Moderate),
            "detailed" => Some(Self::Detailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Moderate => "moderate",
            Self::Detailed => "detailed",
        }
    }
}

/// Pedagogy settings for a student.
///
/// Numeric fields carry fixed valid ranges enforced by the mutating tools:
/// `patience_level` and `encouragement_frequency` in [0, 1],
/// `optimal_intervention_delay` non-negative seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedagogyProfile {
    pub patience_level: f64,
    pub preferred_learning_style: LearningStyle,
    pub optimal_intervention_delay: f64,
    pub hint_preference: HintPreference,
    pub encouragement_frequency: f64,
}

impl Default for PedagogyProfile {
    fn default() -> Self {
        Self {
            patience_level: 0.5,
            preferred_learning_style: LearningStyle::Visual,
            optimal_intervention_delay: 3.0,
            hint_preference: HintPreference::Moderate,
            encouragement_frequency: 0.5,
        }
    }
}

/// Rolling estimate of the student's in-the-moment state.
///
/// Scores live in [0, 1]; tools adjust them by bounded deltas rather than
/// setting them outright, so one noisy observation cannot swing the
/// estimate to an extreme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectiveState {
    pub understanding: f64,
    pub frustration: f64,
    pub engagement: f64,
}

impl Default for AffectiveState {
    fn default() -> Self {
        Self {
            understanding: 0.5,
            frustration: 0.5,
            engagement: 0.5,
        }
    }
}

impl AffectiveState {
    /// Apply deltas, clamping each delta to [-1, 1] and the resulting
    /// score to [0, 1].
    pub fn apply_deltas(
        &mut self,
        understanding: Option<f64>,
        frustration: Option<f64>,
        engagement: Option<f64>,
    ) {
        if let Some(d) = understanding {
            self.understanding = clamp_unit(self.understanding + clamp_delta(d));
        }
        if let Some(d) = frustration {
            self.frustration = clamp_unit(self.frustration + clamp_delta(d));
        }
        if let Some(d) = engagement {
            self.engagement = clamp_unit(self.engagement + clamp_delta(d));
        }
    }
}

/// A single session history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub topics_covered: Vec<String>,
    #[serde(default)]
    pub breakthroughs: Vec<String>,
    #[serde(default)]
    pub persistent_errors: Vec<String>,
}

/// Long-term student model persisted across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentModel {
    pub student_id: String,

    /// Competency per topic. Unique keys.
    #[serde(default)]
    pub competencies: BTreeMap<String, CompetencyLevel>,

    #[serde(default)]
    pub pedagogy_profile: PedagogyProfile,

    #[serde(default)]
    pub affective_state: AffectiveState,

    /// Free-form tutor observations about this student.
    #[serde(default)]
    pub notes: Vec<String>,

    #[serde(default)]
    pub session_history: Vec<SessionHistoryEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentModel {
    pub fn new(student_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            student_id: student_id.into(),
            competencies: BTreeMap::new(),
            pedagogy_profile: PedagogyProfile::default(),
            affective_state: AffectiveState::default(),
            notes: Vec::new(),
            session_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update competency level for a topic.
    pub fn update_competency(&mut self, topic: impl Into<String>, level: CompetencyLevel) {
        self.competencies.insert(topic.into(), level);
        self.updated_at = Utc::now();
    }

    /// Add a session history entry.
    pub fn add_session(&mut self, entry: SessionHistoryEntry) {
        self.session_history.push(entry);
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Clamp a unit-interval profile value into [0, 1].
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Clamp a delta value into [-1, 1].
pub fn clamp_delta(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_competency_touches_updated_at() {
        let mut model = StudentModel::new("alice");
        let before = model.updated_at;
        model.update_competency("fractions", CompetencyLevel::Struggling);
        assert!(model.updated_at >= before);
        assert_eq!(
            model.competencies.get("fractions"),
            Some(&CompetencyLevel::Struggling)
        );
    }

    #[test]
    fn competency_keys_unique() {
        let mut model = StudentModel::new("bob");
        model.update_competency("algebra", CompetencyLevel::Struggling);
        model.update_competency("algebra", CompetencyLevel::Mastered);
        assert_eq!(model.competencies.len(), 1);
        assert_eq!(
            model.competencies.get("algebra"),
            Some(&CompetencyLevel::Mastered)
        );
    }

    #[test]
    fn affective_deltas_bounded() {
        let mut state = AffectiveState::default();
        // A delta of 5.0 clamps to 1.0, landing the score at the ceiling.
        state.apply_deltas(Some(5.0), None, Some(-5.0));
        assert_eq!(state.understanding, 1.0);
        assert_eq!(state.engagement, 0.0);
        assert_eq!(state.frustration, 0.5);
    }

    #[test]
    fn clamps() {
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(0.7), 0.7);
        assert_eq!(clamp_delta(2.0), 1.0);
        assert_eq!(clamp_delta(-2.0), -1.0);
    }

    #[test]
    fn model_serialization_roundtrip() {
        let model = StudentModel::new("carol");
        let json = serde_json::to_string(&model).unwrap();
        let back: StudentModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.student_id, "carol");
        assert_eq!(back.pedagogy_profile.patience_level, 0.5);
    }

    #[test]
    fn learning_style_parse_rejects_unknown() {
        assert_eq!(LearningStyle::parse("visual"), Some(LearningStyle::Visual));
        assert_eq!(LearningStyle::parse("osmosis"), None);
    }
}
