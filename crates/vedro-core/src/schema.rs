//! Learning pack schema: the contract shown to the model and the checks run
//! against what comes back.

use serde_json::{json, Value};

use crate::error::{SchemaError, SchemaViolation};
use crate::model::LearningPack;
use crate::traits::extract_json_from_markdown;

pub const KEY_POINTS: (usize, usize) = (3, 5);
pub const STEPS: (usize, usize) = (3, 6);
pub const CAUSE_EFFECT: (usize, usize) = (2, 4);
pub const QUIZ_QUESTIONS: (usize, usize) = (3, 5);
pub const QUIZ_OPTIONS: usize = 4;

/// Which rule set applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// A real topic: every section populated within its bounds.
    Strict,
    /// A greeting: summary only, every list empty.
    Greeting,
}

/// JSON schema embedded in the learning pack prompt.
pub fn learning_pack_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "simpleSummary",
            "keyLearningPoints",
            "stepByStepExplanation",
            "causeAndEffect",
            "quizQuestions"
        ],
        "properties": {
            "simpleSummary": {
                "type": "string",
                "description": "A very simple explanation of the topic in 3-5 sentences, as if teaching a beginner."
            },
            "keyLearningPoints": {
                "type": "array",
                "minItems": KEY_POINTS.0,
                "maxItems": KEY_POINTS.1,
                "description": "The most important ideas of the concept, presented as 3-5 distinct points.",
                "items": {
                    "type": "object",
                    "required": ["title", "description"],
                    "properties": {
                        "title": { "type": "string", "description": "A short, catchy title for the key idea." },
                        "description": { "type": "string", "description": "A 1-2 sentence explanation of the point." }
                    }
                }
            },
            "stepByStepExplanation": {
                "type": "array",
                "minItems": STEPS.0,
                "maxItems": STEPS.1,
                "description": "A clear, sequential explanation of the process or logic in 3-6 ordered steps.",
                "items": { "type": "string" }
            },
            "causeAndEffect": {
                "type": "array",
                "minItems": CAUSE_EFFECT.0,
                "maxItems": CAUSE_EFFECT.1,
                "description": "A series of 2-4 cause-and-effect relationships related to the topic.",
                "items": {
                    "type": "object",
                    "required": ["cause", "effect"],
                    "properties": {
                        "cause": { "type": "string", "description": "The cause or action." },
                        "effect": { "type": "string", "description": "The resulting effect." }
                    }
                }
            },
            "quizQuestions": {
                "type": "array",
                "minItems": QUIZ_QUESTIONS.0,
                "maxItems": QUIZ_QUESTIONS.1,
                "description": "A mini-quiz with 3-5 multiple-choice questions.",
                "items": {
                    "type": "object",
                    "required": ["question", "options", "correctAnswer"],
                    "properties": {
                        "question": { "type": "string", "description": "A multiple-choice question to test understanding of a key concept." },
                        "options": {
                            "type": "array",
                            "minItems": QUIZ_OPTIONS,
                            "maxItems": QUIZ_OPTIONS,
                            "items": { "type": "string" },
                            "description": "Four potential answers to the question (A, B, C, D)."
                        },
                        "correctAnswer": { "type": "string", "description": "The correct answer, copied exactly from the four options." }
                    }
                }
            }
        }
    })
}

struct Checker {
    violations: Vec<SchemaViolation>,
}

impl Checker {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn not_blank(&mut self, field: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        }
    }

    fn count(&mut self, field: &str, len: usize, (min, max): (usize, usize)) {
        if len < min || len > max {
            self.push(field, format!("expected {min}-{max} items, got {len}"));
        }
    }

    fn empty(&mut self, field: &str, len: usize) {
        if len != 0 {
            self.push(field, format!("must be empty for a greeting, got {len} items"));
        }
    }
}

/// Check a pack against the rules for `mode`, returning every violation.
pub fn validate_learning_pack(pack: &LearningPack, mode: SchemaMode) -> Vec<SchemaViolation> {
    let mut c = Checker {
        violations: Vec::new(),
    };

    c.not_blank("simpleSummary", &pack.simple_summary);

    if mode == SchemaMode::Greeting {
        c.empty("keyLearningPoints", pack.key_learning_points.len());
        c.empty("stepByStepExplanation", pack.step_by_step_explanation.len());
        c.empty("causeAndEffect", pack.cause_and_effect.len());
        c.empty("quizQuestions", pack.quiz_questions.len());
        return c.violations;
    }

    c.count("keyLearningPoints", pack.key_learning_points.len(), KEY_POINTS);
    for (i, point) in pack.key_learning_points.iter().enumerate() {
        c.not_blank(format!("keyLearningPoints[{i}].title"), &point.title);
        c.not_blank(format!("keyLearningPoints[{i}].description"), &point.description);
    }

    c.count("stepByStepExplanation", pack.step_by_step_explanation.len(), STEPS);
    for (i, step) in pack.step_by_step_explanation.iter().enumerate() {
        c.not_blank(format!("stepByStepExplanation[{i}]"), step);
    }

    c.count("causeAndEffect", pack.cause_and_effect.len(), CAUSE_EFFECT);
    for (i, pair) in pack.cause_and_effect.iter().enumerate() {
        c.not_blank(format!("causeAndEffect[{i}].cause"), &pair.cause);
        c.not_blank(format!("causeAndEffect[{i}].effect"), &pair.effect);
    }

    c.count("quizQuestions", pack.quiz_questions.len(), QUIZ_QUESTIONS);
    for (i, q) in pack.quiz_questions.iter().enumerate() {
        c.not_blank(format!("quizQuestions[{i}].question"), &q.question);
        if q.options.len() != QUIZ_OPTIONS {
            c.push(
                format!("quizQuestions[{i}].options"),
                format!("expected exactly {QUIZ_OPTIONS} options, got {}", q.options.len()),
            );
        }
        for (j, option) in q.options.iter().enumerate() {
            c.not_blank(format!("quizQuestions[{i}].options[{j}]"), option);
        }
        if !q.options.iter().any(|o| o == &q.correct_answer) {
            c.push(
                format!("quizQuestions[{i}].correctAnswer"),
                format!("'{}' is not one of the options", q.correct_answer),
            );
        }
    }

    c.violations
}

/// Extract, deserialize, and validate a learning pack from raw model output.
pub fn parse_learning_pack(raw: &str, mode: SchemaMode) -> Result<LearningPack, SchemaError> {
    let json = extract_json_from_markdown(raw);
    let pack: LearningPack =
        serde_json::from_str(&json).map_err(|e| SchemaError::Parse(e.to_string()))?;

    let violations = validate_learning_pack(&pack, mode);
    if violations.is_empty() {
        Ok(pack)
    } else {
        Err(SchemaError::Invalid(violations))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{CauseEffect, KeyLearningPoint, LearningPack, QuizQuestion};

    pub fn question(q: &str, answer: &str) -> QuizQuestion {
        QuizQuestion {
            question: q.into(),
            options: vec![answer.into(), "Nitrogen".into(), "Helium".into(), "Argon".into()],
            correct_answer: answer.into(),
        }
    }

    pub fn valid_pack() -> LearningPack {
        LearningPack {
            simple_summary: "Photosynthesis is how plants turn light into food.".into(),
            key_learning_points: vec![
                KeyLearningPoint {
                    title: "Light".into(),
                    description: "Sunlight powers the reaction.".into(),
                },
                KeyLearningPoint {
                    title: "Chlorophyll".into(),
                    description: "The green pigment captures light.".into(),
                },
                KeyLearningPoint {
                    title: "Glucose".into(),
                    description: "Sugar stores the captured energy.".into(),
                },
            ],
            step_by_step_explanation: vec![
                "Leaves absorb light.".into(),
                "Water is split.".into(),
                "Carbon dioxide is fixed into sugar.".into(),
            ],
            cause_and_effect: vec![
                CauseEffect {
                    cause: "More light".into(),
                    effect: "Faster sugar production".into(),
                },
                CauseEffect {
                    cause: "No water".into(),
                    effect: "The plant wilts".into(),
                },
            ],
            quiz_questions: vec![
                question("Which gas is released?", "Oxygen"),
                question("Which gas is absorbed?", "Carbon dioxide"),
                question("Where does it happen?", "Chloroplast"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::valid_pack;
    use super::*;

    #[test]
    fn valid_pack_passes_strict() {
        assert!(validate_learning_pack(&valid_pack(), SchemaMode::Strict).is_empty());
    }

    #[test]
    fn strict_reports_bounds() {
        let mut pack = valid_pack();
        pack.key_learning_points.truncate(1);
        pack.quiz_questions.clear();
        let violations = validate_learning_pack(&pack, SchemaMode::Strict);
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["keyLearningPoints", "quizQuestions"]);
    }

    #[test]
    fn strict_checks_options_and_answer() {
        let mut pack = valid_pack();
        pack.quiz_questions[0].options.pop();
        pack.quiz_questions[1].correct_answer = "Plasma".into();
        let violations = validate_learning_pack(&pack, SchemaMode::Strict);
        assert!(violations
            .iter()
            .any(|v| v.field == "quizQuestions[0].options"));
        assert!(violations
            .iter()
            .any(|v| v.field == "quizQuestions[1].correctAnswer"));
    }

    #[test]
    fn strict_rejects_blank_strings() {
        let mut pack = valid_pack();
        pack.step_by_step_explanation[1] = "   ".into();
        let violations = validate_learning_pack(&pack, SchemaMode::Strict);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "stepByStepExplanation[1]");
    }

    #[test]
    fn greeting_mode_requires_empty_lists() {
        let greeting = LearningPack {
            simple_summary: "Hi! What would you like to learn about today?".into(),
            key_learning_points: vec![],
            step_by_step_explanation: vec![],
            cause_and_effect: vec![],
            quiz_questions: vec![],
        };
        assert!(validate_learning_pack(&greeting, SchemaMode::Greeting).is_empty());
        assert!(!validate_learning_pack(&valid_pack(), SchemaMode::Greeting).is_empty());
    }

    #[test]
    fn parse_fenced_pack() {
        let raw = format!(
            "Here is your lesson:\n```json\n{}\n```",
            serde_json::to_string_pretty(&valid_pack()).unwrap()
        );
        let pack = parse_learning_pack(&raw, SchemaMode::Strict).unwrap();
        assert_eq!(pack, valid_pack());
    }

    #[test]
    fn parse_garbage_is_parse_error() {
        let err = parse_learning_pack("I cannot help with that.", SchemaMode::Strict).unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn parse_short_pack_is_invalid() {
        let err = parse_learning_pack(r#"{"simpleSummary": "Gravity pulls."}"#, SchemaMode::Strict)
            .unwrap_err();
        match err {
            SchemaError::Invalid(v) => assert_eq!(v.len(), 4),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = learning_pack_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        assert_eq!(
            schema["properties"]["quizQuestions"]["items"]["properties"]["options"]["minItems"],
            4
        );
    }
}
