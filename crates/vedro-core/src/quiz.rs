//! Quiz runner game loop and mini-quiz grading.

use serde::Serialize;
use thiserror::Error;

use crate::model::QuizQuestion;

pub const GAME_DURATION_SECS: u32 = 60;
pub const POINTS_PER_CORRECT: u32 = 10;
pub const WRONG_ANSWER_PENALTY_SECS: u32 = 3;
pub const BASE_SCROLL_SPEED: f64 = 1.0;
pub const MAX_SCROLL_SPEED: f64 = 4.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("cannot {action} while the quiz is {state:?}")]
    InvalidState { action: &'static str, state: GameState },

    #[error("'{0}' is not one of the options")]
    UnknownOption(String),

    #[error("answer every question before submitting ({answered} of {total} answered)")]
    Incomplete { answered: usize, total: usize },

    #[error("got {given} answers for {total} questions")]
    TooManyAnswers { given: usize, total: usize },
}

/// A question from the built-in bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankQuestion {
    pub question: &'static str,
    pub options: [&'static str; 4],
    pub answer: &'static str,
}

impl BankQuestion {
    pub fn to_quiz_question(&self) -> QuizQuestion {
        QuizQuestion {
            question: self.question.to_string(),
            options: self.options.iter().map(|o| o.to_string()).collect(),
            correct_answer: self.answer.to_string(),
        }
    }
}

pub const QUESTION_BANK: [BankQuestion; 7] = [
    BankQuestion {
        question: "What is the chemical symbol for Gold?",
        options: ["Ag", "Au", "Ge", "Go"],
        answer: "Au",
    },
    BankQuestion {
        question: "Which planet is known as the Red Planet?",
        options: ["Mars", "Jupiter", "Venus", "Saturn"],
        answer: "Mars",
    },
    BankQuestion {
        question: "What is the powerhouse of the cell?",
        options: ["Nucleus", "Ribosome", "Mitochondria", "Chloroplast"],
        answer: "Mitochondria",
    },
    BankQuestion {
        question: "H2O is the chemical formula for?",
        options: ["Oxygen", "Water", "Hydrogen Peroxide", "Salt"],
        answer: "Water",
    },
    BankQuestion {
        question: "What force keeps us on the ground?",
        options: ["Magnetism", "Gravity", "Friction", "Tension"],
        answer: "Gravity",
    },
    BankQuestion {
        question: "What is the largest mammal in the world?",
        options: ["Elephant", "Blue Whale", "Giraffe", "Hippo"],
        answer: "Blue Whale",
    },
    BankQuestion {
        question: "Who wrote \"Romeo and Juliet\"?",
        options: ["Charles Dickens", "William Shakespeare", "Jane Austen", "Mark Twain"],
        answer: "William Shakespeare",
    },
];

/// The whole bank as [`QuizQuestion`]s.
pub fn bank_questions() -> Vec<QuizQuestion> {
    QUESTION_BANK.iter().map(BankQuestion::to_quiz_question).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Start,
    Playing,
    Question,
    End,
}

/// Outcome of one answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub chosen: String,
    pub correct_answer: String,
    pub score: u32,
    pub time_left: u32,
}

/// Headless quiz runner. A front end drives it with `tick` once per second
/// and `catch_scroll` when the player catches a falling question.
#[derive(Debug, Clone)]
pub struct QuizSession {
    state: GameState,
    score: u32,
    time_left: u32,
    active: Option<QuizQuestion>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self {
            state: GameState::Start,
            score: 0,
            time_left: GAME_DURATION_SECS,
            active: None,
        }
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn active_question(&self) -> Option<&QuizQuestion> {
        self.active.as_ref()
    }

    /// Begin (or restart) a game.
    pub fn start(&mut self) {
        *self = Self {
            state: GameState::Playing,
            ..Self::default()
        };
    }

    /// Advance the clock by one second while playing.
    pub fn tick(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.state = GameState::End;
        }
    }

    /// Speed of newly spawned scrolls; rises with the score.
    pub fn scroll_speed(&self) -> f64 {
        (BASE_SCROLL_SPEED + self.score as f64 / 50.0).min(MAX_SCROLL_SPEED)
    }

    /// The player caught a scroll carrying `question`.
    pub fn catch_scroll(&mut self, question: QuizQuestion) -> Result<(), QuizError> {
        if self.state != GameState::Playing {
            return Err(QuizError::InvalidState {
                action: "catch a scroll",
                state: self.state,
            });
        }
        self.active = Some(question);
        self.state = GameState::Question;
        Ok(())
    }

    /// Answer the active question.
    pub fn answer(&mut self, option: &str) -> Result<AnswerOutcome, QuizError> {
        let question = match (&self.state, &self.active) {
            (GameState::Question, Some(q)) => q,
            _ => {
                return Err(QuizError::InvalidState {
                    action: "answer",
                    state: self.state,
                })
            }
        };
        if !question.options.iter().any(|o| o == option) {
            return Err(QuizError::UnknownOption(option.to_string()));
        }

        let correct = option == question.correct_answer;
        let correct_answer = question.correct_answer.clone();
        if correct {
            self.score += POINTS_PER_CORRECT;
        } else {
            self.time_left = self.time_left.saturating_sub(WRONG_ANSWER_PENALTY_SECS);
        }

        self.active = None;
        self.state = if self.time_left > 0 {
            GameState::Playing
        } else {
            GameState::End
        };

        Ok(AnswerOutcome {
            correct,
            chosen: option.to_string(),
            correct_answer,
            score: self.score,
            time_left: self.time_left,
        })
    }

    /// End the game early.
    pub fn end(&mut self) {
        self.active = None;
        self.state = GameState::End;
    }
}

// ---------------------------------------------------------------------------
// Mini-quiz grading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionGrade {
    pub question: String,
    pub chosen: String,
    pub correct_answer: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizGrade {
    pub correct: usize,
    pub total: usize,
    pub per_question: Vec<QuestionGrade>,
}

/// Grade a submitted mini-quiz. Every question must have exactly one
/// non-blank answer.
///
/// Answers match options exactly, or by letter (`A`-`D`, case-insensitive).
pub fn grade(questions: &[QuizQuestion], answers: &[String]) -> Result<QuizGrade, QuizError> {
    let total = questions.len();
    if answers.len() > total {
        return Err(QuizError::TooManyAnswers {
            given: answers.len(),
            total,
        });
    }
    let answered = answers.iter().filter(|a| !a.trim().is_empty()).count();
    if answered < total {
        return Err(QuizError::Incomplete { answered, total });
    }

    let per_question: Vec<QuestionGrade> = questions
        .iter()
        .zip(answers)
        .map(|(q, a)| {
            let chosen = resolve_answer(q, a);
            QuestionGrade {
                question: q.question.clone(),
                correct: chosen == q.correct_answer,
                chosen,
                correct_answer: q.correct_answer.clone(),
            }
        })
        .collect();

    Ok(QuizGrade {
        correct: per_question.iter().filter(|g| g.correct).count(),
        total,
        per_question,
    })
}

fn resolve_answer(question: &QuizQuestion, answer: &str) -> String {
    let answer = answer.trim();
    let mut chars = answer.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        let letter = letter.to_ascii_uppercase();
        if ('A'..='D').contains(&letter) {
            let index = (letter as u8 - b'A') as usize;
            if let Some(option) = question.options.get(index) {
                return option.clone();
            }
        }
    }
    answer.to_string()
}
