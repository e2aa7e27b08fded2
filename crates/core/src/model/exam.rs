use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{CourseId, ExamId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("time limit must be > 0 minutes")]
    InvalidTimeLimit,

    #[error("exam closes before it opens")]
    InvalidWindow,

    #[error("question {question_id} prompt cannot be empty")]
    EmptyPrompt { question_id: QuestionId },

    #[error("question {question_id} needs at least 2 options, got {count}")]
    TooFewOptions { question_id: QuestionId, count: usize },

    #[error("question {question_id} marks option {index} correct but has {count} options")]
    CorrectOptionOutOfRange {
        question_id: QuestionId,
        index: usize,
        count: usize,
    },

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

/// Minimum number of options a multiple-choice question must offer.
pub const MIN_OPTIONS: usize = 2;

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
///
/// The correct option travels with the question because the catalog is local;
/// only the scoring side should read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyPrompt`, `ExamError::TooFewOptions` or
    /// `ExamError::CorrectOptionOutOfRange`.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, ExamError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ExamError::EmptyPrompt { question_id: id });
        }
        if options.len() < MIN_OPTIONS {
            return Err(ExamError::TooFewOptions {
                question_id: id,
                count: options.len(),
            });
        }
        if correct_option >= options.len() {
            return Err(ExamError::CorrectOptionOutOfRange {
                question_id: id,
                index: correct_option,
                count: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_option
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated exam definition, as read from a catalog or built by hand.
#[derive(Debug, Clone)]
pub struct ExamDraft {
    pub id: ExamId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_minutes: u32,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl ExamDraft {
    /// Validate the draft into an immutable `Exam`.
    ///
    /// An exam without questions is still a valid catalog entry; starting a
    /// session on it is what fails.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if the title, time limit, window or question ids are invalid.
    pub fn validate(self) -> Result<Exam, ExamError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if self.time_limit_minutes == 0 {
            return Err(ExamError::InvalidTimeLimit);
        }
        if self.available_until < self.available_from {
            return Err(ExamError::InvalidWindow);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(question.id()) {
                return Err(ExamError::DuplicateQuestion(question.id()));
            }
        }

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Exam {
            id: self.id,
            course_id: self.course_id,
            title,
            description,
            time_limit_minutes: self.time_limit_minutes,
            available_from: self.available_from,
            available_until: self.available_until,
            questions: self.questions,
        })
    }
}

/// A timed exam with an ordered list of questions. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    time_limit_minutes: u32,
    available_from: DateTime<Utc>,
    available_until: DateTime<Utc>,
    questions: Vec<Question>,
}

impl Exam {
    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Time allowance in seconds.
    #[must_use]
    pub fn time_limit_secs(&self) -> u64 {
        u64::from(self.time_limit_minutes) * 60
    }

    #[must_use]
    pub fn available_from(&self) -> DateTime<Utc> {
        self.available_from
    }

    #[must_use]
    pub fn available_until(&self) -> DateTime<Utc> {
        self.available_until
    }

    /// Whether the exam may be started at `at`. Both ends of the window are inclusive.
    #[must_use]
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.available_from <= at && at <= self.available_until
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn position_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id() == id)
    }
}
