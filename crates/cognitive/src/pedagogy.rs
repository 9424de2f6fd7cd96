//! Pedagogy heuristics — cheap textual signals about the student.
//!
//! These run on transcript text and session timings, entirely offline.
//! They inform the trigger detector and give the reasoner ready-made
//! assessments; none of them claim to be more than keyword heuristics.

use oxtutor_core::student::{HintPreference, PedagogyProfile};

const CONFUSION_MARKERS: [&str; 8] = [
    "i don't get",
    "i don't understand",
    "confused",
    "confusing",
    "doesn't make sense",
    "what does that mean",
    "lost",
    "no idea",
];

const QUESTION_OPENERS: [&str; 7] = [
    "how do",
    "how can",
    "what is",
    "what's",
    "why does",
    "can you",
    "help",
];

const STUCK_MARKERS: [&str; 5] = [
    "i'm stuck",
    "im stuck",
    "can't figure",
    "cant figure",
    "give up",
];

/// Confusion estimate from a transcript window.
#[derive(Debug, Clone)]
pub struct ConfusionAssessment {
    /// 0.0 (clear) to 1.0 (lost), keyword-driven.
    pub score: f64,
    pub indicators: Vec<&'static str>,
}

/// Scan for confusion markers. Each distinct marker adds 0.25, capped at 1.
pub fn assess_confusion(transcript: &str) -> ConfusionAssessment {
    let lower = transcript.to_lowercase();
    let indicators: Vec<&'static str> = CONFUSION_MARKERS
        .iter()
        .filter(|m| lower.contains(**m))
        .copied()
        .collect();
    ConfusionAssessment {
        score: (indicators.len() as f64 * 0.25).min(1.0),
        indicators,
    }
}

/// Does the text read like a question aimed at the tutor?
pub fn detect_question(transcript: &str) -> bool {
    let lower = transcript.to_lowercase();
    lower.contains('?') || QUESTION_OPENERS.iter().any(|q| lower.contains(q))
}

/// Stuck-pattern estimate combining text and timing signals.
#[derive(Debug, Clone)]
pub struct StuckAssessment {
    pub is_stuck: bool,
    pub score: f64,
    pub signals: Vec<&'static str>,
}

const STUCK_THRESHOLD: f64 = 0.4;
const LONG_SILENCE_SECONDS: f64 = 10.0;
const UNCHANGED_WHITEBOARD_SECONDS: f64 = 15.0;

/// Weigh the stuck signals: long silence, an unchanging whiteboard,
/// explicit "I'm stuck" phrasing, and the same phrase repeated.
pub fn detect_stuck_pattern(
    transcript: &str,
    silence_duration: f64,
    whiteboard_unchanged: Option<f64>,
) -> StuckAssessment {
    let mut score = 0.0;
    let mut signals = Vec::new();
    let lower = transcript.to_lowercase();

    if silence_duration > LONG_SILENCE_SECONDS {
        score += 0.3;
        signals.push("long_silence");
    }
    if whiteboard_unchanged.is_some_and(|d| d > UNCHANGED_WHITEBOARD_SECONDS) {
        score += 0.3;
        signals.push("unchanged_whiteboard");
    }
    if STUCK_MARKERS.iter().any(|m| lower.contains(m)) {
        score += 0.4;
        signals.push("explicit_indicator");
    }
    if has_repetition(&lower) {
        score += 0.2;
        signals.push("repetition");
    }

    StuckAssessment {
        is_stuck: score > STUCK_THRESHOLD,
        score: score.min(1.0),
        signals,
    }
}

/// A sentence said twice in the same window counts as circling.
fn has_repetition(lower: &str) -> bool {
    let sentences: Vec<&str> = lower
        .split(['.', '\n', '?', '!'])
        .map(str::trim)
        .filter(|s| s.len() > 10)
        .collect();
    for (i, a) in sentences.iter().enumerate() {
        if sentences[i + 1..].contains(a) {
            return true;
        }
    }
    false
}

/// A concrete suggestion for how to step in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionStrategy {
    /// "wait", "ask_question", or "give_hint".
    pub approach: &'static str,
    /// Speak tone to pair with the approach.
    pub tone: &'static str,
    /// How detailed a hint should be, from the student's preference.
    pub hint_detail: &'static str,
}

/// Map assessments onto an intervention, shaped by the student's profile.
///
/// Patient students get a question first; a clearly stuck student gets a
/// hint sized to their preference; otherwise keep waiting.
pub fn suggest_intervention_strategy(
    profile: &PedagogyProfile,
    stuck: &StuckAssessment,
    confusion: &ConfusionAssessment,
) -> InterventionStrategy {
    let hint_detail = match profile.hint_preference {
        HintPreference::Minimal => "minimal",
        HintPreference::Moderate => "moderate",
        HintPreference::Detailed => "detailed",
    };

    if stuck.is_stuck && confusion.score >= 0.5 {
        return InterventionStrategy {
            approach: "give_hint",
            tone: "encouraging",
            hint_detail,
        };
    }
    if stuck.is_stuck {
        // High-patience students prefer being prompted over being told.
        let approach = if profile.patience_level >= 0.6 {
            "ask_question"
        } else {
            "give_hint"
        };
        return InterventionStrategy {
            approach,
            tone: "questioning",
            hint_detail,
        };
    }
    if confusion.score >= 0.5 {
        return InterventionStrategy {
            approach: "ask_question",
            tone: "neutral",
            hint_detail,
        };
    }
    InterventionStrategy {
        approach: "wait",
        tone: "neutral",
        hint_detail,
    }
}

/// Result of checking the student's arithmetic.
#[derive(Debug, Clone)]
pub struct CalculationCheck {
    pub correct: bool,
    pub expected: f64,
}

const ANSWER_TOLERANCE: f64 = 1e-6;

/// Evaluate `expression` and compare against the student's answer.
pub fn verify_calculation(expression: &str, student_answer: f64) -> Result<CalculationCheck, String> {
    let expected = evaluate(expression)?;
    Ok(CalculationCheck {
        correct: (expected - student_answer).abs() < ANSWER_TOLERANCE,
        expected,
    })
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate an arithmetic expression: `+`, `-`, `*`, `/`, `^`,
/// parentheses, unary negation, decimal numbers.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, parser.tokens[parser.pos]
        ));
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {num_str}"))?;
                tokens.push(Token::Number(num));
            }
            c => return Err(format!("Unexpected character: '{c}'")),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = power (('*' | '/') power)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_power()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_power()?;
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_power()?;
                    if right == 0.0 {
                        return Err("Division by zero".into());
                    }
                    left /= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // power = unary ('^' power)?   (right-associative)
    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_unary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // unary = '-' unary | primary
    fn parse_unary(&mut self) -> Result<f64, String> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            let val = self.parse_unary()?;
            return Ok(-val);
        }
        self.parse_primary()
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected token: {tok:?}")),
            None => Err("Unexpected end of expression".into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use oxtutor_core::student::LearningStyle;

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
    }

    #[test]
    fn parentheses() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn power_binds_tighter_than_multiply() {
        assert_eq!(evaluate("2 * 3 ^ 2").unwrap(), 18.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
    }

    #[test]
    fn unary_negation() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
    }

    #[test]
    fn division_by_zero() {
        assert!(evaluate("1 / 0").is_err());
    }

    #[test]
    fn invalid_expression() {
        assert!(evaluate("2 +").is_err());
    }

    #[test]
    fn empty_expression() {
        assert!(evaluate("").is_err());
    }

    #[test]
    fn verify_accepts_close_answer() {
        let check = verify_calculation("(10 + 5) / 3", 5.0).unwrap();
        assert!(check.correct);
        assert_eq!(check.expected, 5.0);
    }

    #[test]
    fn verify_rejects_wrong_answer() {
        let check = verify_calculation("2 ^ 4", 8.0).unwrap();
        assert!(!check.correct);
        assert_eq!(check.expected, 16.0);
    }

    #[test]
    fn confusion_markers_accumulate() {
        let quiet = assess_confusion("okay so I multiply both sides");
        assert_eq!(quiet.score, 0.0);

        let lost = assess_confusion("I don't get it, this is so confusing, I'm lost");
        assert!(lost.score >= 0.5);
        assert!(lost.indicators.contains(&"confused") || lost.indicators.contains(&"confusing"));
    }

    #[test]
    fn questions_detected_by_phrasing() {
        assert!(detect_question("how do I isolate x"));
        assert!(detect_question("is this right?"));
        assert!(!detect_question("okay multiplying now"));
    }

    #[test]
    fn silence_and_frozen_whiteboard_mean_stuck() {
        let stuck = detect_stuck_pattern("", 12.0, Some(20.0));
        assert!(stuck.is_stuck);
        assert!(stuck.signals.contains(&"long_silence"));
        assert!(stuck.signals.contains(&"unchanged_whiteboard"));
    }

    #[test]
    fn explicit_indicator_alone_is_not_enough() {
        // 0.4 does not clear the > 0.4 threshold by itself.
        let stuck = detect_stuck_pattern("I'm stuck on this one", 1.0, None);
        assert!(!stuck.is_stuck);
        assert!(stuck.signals.contains(&"explicit_indicator"));
    }

    #[test]
    fn repetition_is_recognized() {
        let text = "maybe I divide by two here. maybe I divide by two here.";
        let stuck = detect_stuck_pattern(text, 12.0, None);
        assert!(stuck.signals.contains(&"repetition"));
        assert!(stuck.is_stuck);
    }

    #[test]
    fn strategy_respects_patience() {
        let mut profile = PedagogyProfile::default();
        profile.preferred_learning_style = LearningStyle::Visual;
        let stuck = StuckAssessment {
            is_stuck: true,
            score: 0.6,
            signals: vec!["long_silence"],
        };
        let calm = ConfusionAssessment {
            score: 0.0,
            indicators: vec![],
        };

        profile.patience_level = 0.9;
        let s = suggest_intervention_strategy(&profile, &stuck, &calm);
        assert_eq!(s.approach, "ask_question");

        profile.patience_level = 0.2;
        let s = suggest_intervention_strategy(&profile, &stuck, &calm);
        assert_eq!(s.approach, "give_hint");
    }

    #[test]
    fn no_signals_means_wait() {
        let profile = PedagogyProfile::default();
        let stuck = detect_stuck_pattern("working through it", 1.0, Some(2.0));
        let confusion = assess_confusion("working through it");
        let s = suggest_intervention_strategy(&profile, &stuck, &confusion);
        assert_eq!(s.approach, "wait");
    }
}
