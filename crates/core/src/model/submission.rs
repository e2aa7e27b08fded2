use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::exam::Exam;
use crate::model::ids::{ExamId, QuestionId, SubmissionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    #[error("submission is for exam {found}, expected exam {expected}")]
    ExamMismatch { expected: ExamId, found: ExamId },

    #[error("submission answers question {0}, which is not part of the exam")]
    UnknownQuestion(QuestionId),

    #[error("submission answers question {question_id} with option {option_index}, which does not exist")]
    InvalidOption {
        question_id: QuestionId,
        option_index: usize,
    },
}

/// Error returned when a stored submission kind cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid submission kind: {0}")]
pub struct ParseSubmissionKindError(String);

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// One answered question inside a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAnswer {
    pub question_id: QuestionId,
    pub option_index: usize,
}

/// How a session produced its submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    /// The student submitted explicitly.
    Submitted,
    /// The time limit ran out.
    Expired,
}

impl SubmissionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionKind::Submitted => "submitted",
            SubmissionKind::Expired => "expired",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = ParseSubmissionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "expired" => Ok(Self::Expired),
            other => Err(ParseSubmissionKindError(other.to_owned())),
        }
    }
}

/// Frozen record of the answers given during one exam attempt.
///
/// Answers are ordered by the exam's question order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSubmission {
    exam_id: ExamId,
    answers: Vec<SelectedAnswer>,
    time_taken_secs: u64,
    kind: SubmissionKind,
}

impl ExamSubmission {
    #[must_use]
    pub fn new(
        exam_id: ExamId,
        answers: Vec<SelectedAnswer>,
        time_taken_secs: u64,
        kind: SubmissionKind,
    ) -> Self {
        Self {
            exam_id,
            answers,
            time_taken_secs,
            kind,
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn answers(&self) -> &[SelectedAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u64 {
        self.time_taken_secs
    }

    #[must_use]
    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<usize> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| a.option_index)
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Correctness of a single submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub option_index: usize,
    pub correct: bool,
}

/// Score of a submission before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: u32,
    pub total_questions: u32,
    pub outcomes: Vec<AnswerOutcome>,
}

impl Grade {
    /// Mark every answer of `submission` against `exam`.
    ///
    /// Unanswered questions count towards the total but produce no outcome.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` if the submission belongs to another exam or
    /// references questions/options the exam does not have.
    pub fn compute(exam: &Exam, submission: &ExamSubmission) -> Result<Self, GradingError> {
        if submission.exam_id() != exam.id() {
            return Err(GradingError::ExamMismatch {
                expected: exam.id(),
                found: submission.exam_id(),
            });
        }

        let mut outcomes = Vec::with_capacity(submission.answers().len());
        let mut score = 0_u32;
        for answer in submission.answers() {
            let question = exam
                .question(answer.question_id)
                .ok_or(GradingError::UnknownQuestion(answer.question_id))?;
            if !question.has_option(answer.option_index) {
                return Err(GradingError::InvalidOption {
                    question_id: answer.question_id,
                    option_index: answer.option_index,
                });
            }
            let correct = question.is_correct(answer.option_index);
            if correct {
                score = score.saturating_add(1);
            }
            outcomes.push(AnswerOutcome {
                question_id: answer.question_id,
                option_index: answer.option_index,
                correct,
            });
        }

        Ok(Self {
            score,
            total_questions: u32::try_from(exam.question_count()).unwrap_or(u32::MAX),
            outcomes,
        })
    }
}

/// Scored submission as returned by the result recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    submission_id: SubmissionId,
    exam_id: ExamId,
    grade: Grade,
}

impl ExamResult {
    #[must_use]
    pub fn new(submission_id: SubmissionId, exam_id: ExamId, grade: Grade) -> Self {
        Self {
            submission_id,
            exam_id,
            grade,
        }
    }

    #[must_use]
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.grade.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.grade.total_questions
    }

    #[must_use]
    pub fn outcomes(&self) -> &[AnswerOutcome] {
        &self.grade.outcomes
    }

    #[must_use]
    pub fn grade(&self) -> &Grade {
        &self.grade
    }

    /// Score as a percentage of all questions, 0 for an empty exam.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.grade.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.grade.score) * 100.0 / f64::from(self.grade.total_questions)
    }
}
