use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::ExamId;

//
// ─── EXAM KIND ─────────────────────────────────────────────────────────────────
//

/// Which paper an exam belongs to. Each kind has its own section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    Reading,
    Listening,
}

impl ExamKind {
    pub const ALL: [ExamKind; 2] = [ExamKind::Reading, ExamKind::Listening];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamKind::Reading => "reading",
            ExamKind::Listening => "listening",
        }
    }
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamKind {
    type Err = ExamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reading" => Ok(ExamKind::Reading),
            "listening" => Ok(ExamKind::Listening),
            other => Err(ExamError::UnknownKind(other.to_string())),
        }
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("unknown exam kind: {0}")]
    UnknownKind(String),

    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("exam has no questions")]
    NoQuestions,

    #[error("time limit must be > 0 minutes")]
    InvalidTimeLimit,

    #[error("question numbers must run 1..N without gaps (expected {expected}, found {found})")]
    QuestionOutOfSequence { expected: u32, found: u32 },

    #[error("question {number} needs at least two options")]
    TooFewOptions { number: u32 },

    #[error("question {number} marks option {correct} correct but has {options} options")]
    CorrectOutOfRange {
        number: u32,
        correct: usize,
        options: usize,
    },
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question as supplied by the content loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub number: u32,
    #[serde(default)]
    pub passage: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: usize,
}

/// A complete, read-only exam paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDefinition {
    id: ExamId,
    title: String,
    kind: ExamKind,
    time_limit_minutes: u32,
    questions: Vec<Question>,
}

impl ExamDefinition {
    /// Builds an exam definition, checking question numbering and answer keys.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if the title is blank, the time limit is zero, there
    /// are no questions, numbering is not `1..N`, or an answer key is invalid.
    pub fn new(
        id: ExamId,
        title: impl Into<String>,
        kind: ExamKind,
        time_limit_minutes: u32,
        questions: Vec<Question>,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if time_limit_minutes == 0 {
            return Err(ExamError::InvalidTimeLimit);
        }
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }

        for (expected, question) in (1_u32..).zip(&questions) {
            if question.number != expected {
                return Err(ExamError::QuestionOutOfSequence {
                    expected,
                    found: question.number,
                });
            }
            if question.options.len() < 2 {
                return Err(ExamError::TooFewOptions {
                    number: question.number,
                });
            }
            if question.correct >= question.options.len() {
                return Err(ExamError::CorrectOutOfRange {
                    number: question.number,
                    correct: question.correct,
                    options: question.options.len(),
                });
            }
        }

        Ok(Self {
            id,
            title,
            kind,
            time_limit_minutes,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ExamKind {
        self.kind
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Number of questions; also the highest question number.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    /// Looks up a question by its 1-based number.
    #[must_use]
    pub fn question(&self, number: u32) -> Option<&Question> {
        let idx = usize::try_from(number.checked_sub(1)?).ok()?;
        self.questions.get(idx)
    }

    /// Counts answers matching the answer key. Unknown question numbers are ignored.
    #[must_use]
    pub fn count_correct(&self, answers: &BTreeMap<u32, usize>) -> u32 {
        let correct = answers
            .iter()
            .filter(|(number, option)| {
                self.question(**number)
                    .is_some_and(|q| q.correct == **option)
            })
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(number: u32, correct: usize) -> Question {
        Question {
            number,
            passage: None,
            prompt: format!("Q{number}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
        }
    }

    #[test]
    fn rejects_gapped_numbering() {
        let err = ExamDefinition::new(
            ExamId::new(1),
            "Mock",
            ExamKind::Reading,
            70,
            vec![question(1, 0), question(3, 0)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExamError::QuestionOutOfSequence {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_answer_key_outside_options() {
        let err = ExamDefinition::new(
            ExamId::new(1),
            "Mock",
            ExamKind::Reading,
            70,
            vec![question(1, 4)],
        )
        .unwrap_err();
        assert!(matches!(err, ExamError::CorrectOutOfRange { number: 1, .. }));
    }

    #[test]
    fn counts_correct_answers_and_ignores_unknown_numbers() {
        let exam = ExamDefinition::new(
            ExamId::new(1),
            "Mock",
            ExamKind::Listening,
            60,
            vec![question(1, 0), question(2, 3), question(3, 1)],
        )
        .unwrap();

        let answers = BTreeMap::from([(1, 0), (2, 1), (3, 1), (99, 0)]);
        assert_eq!(exam.count_correct(&answers), 2);
        assert!(exam.question(0).is_none());
        assert_eq!(exam.question(3).map(|q| q.correct), Some(1));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Reading".parse::<ExamKind>().unwrap(), ExamKind::Reading);
        assert_eq!(ExamKind::Listening.to_string(), "listening");
        assert!("writing".parse::<ExamKind>().is_err());
    }
}
