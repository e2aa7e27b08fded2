use std::collections::HashMap;
use std::fmt;

use lms_core::model::{
    Exam, ExamId, ExamSubmission, Question, QuestionId, SelectedAnswer, SubmissionKind,
};

use super::progress::ExamProgress;
use crate::error::ExamSessionError;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an exam session. `Submitted` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Expired,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::InProgress => "in progress",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Expired => "expired",
        })
    }
}

/// What a call to `ExamSession::tick` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time remains; the session is still in progress.
    Running { remaining_secs: u64 },
    /// The time limit was reached and this submission was frozen.
    Expired(ExamSubmission),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory attempt at a single exam.
///
/// Owned by whoever started it; dropping the session abandons the attempt
/// without producing a submission.
#[derive(Debug, Clone)]
pub struct ExamSession {
    exam: Exam,
    current: usize,
    answers: HashMap<QuestionId, usize>,
    elapsed_secs: u64,
    status: SessionStatus,
    submission: Option<ExamSubmission>,
}

impl ExamSession {
    /// Start a new attempt at `exam`, positioned on the first question.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::InvalidExam` if the exam has no questions.
    pub fn start(exam: Exam) -> Result<Self, ExamSessionError> {
        if exam.question_count() == 0 {
            return Err(ExamSessionError::InvalidExam(exam.id()));
        }

        Ok(Self {
            exam,
            current: 0,
            answers: HashMap::new(),
            elapsed_secs: 0,
            status: SessionStatus::InProgress,
            submission: None,
        })
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam.id()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // `start` rejects empty exams and navigation keeps `current` in bounds.
        &self.exam.questions()[self.current]
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.exam.time_limit_secs().saturating_sub(self.elapsed_secs)
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<usize> {
        self.answers.get(&question_id).copied()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// The frozen submission, once the session is terminal.
    #[must_use]
    pub fn submission(&self) -> Option<&ExamSubmission> {
        self.submission.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            total: self.exam.question_count(),
            answered: self.answered_count(),
            current: self.current,
            remaining_secs: self.remaining_secs(),
            status: self.status,
        }
    }

    fn ensure_in_progress(&self) -> Result<(), ExamSessionError> {
        if self.status.is_terminal() {
            return Err(ExamSessionError::AlreadyTerminal(self.status));
        }
        Ok(())
    }

    /// Record (or overwrite) the answer for one question.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` after submit/expiry, `UnknownQuestion` for a
    /// question outside the exam and `InvalidOption` for an out-of-range option.
    pub fn select_answer(
        &mut self,
        question_id: QuestionId,
        option_index: usize,
    ) -> Result<(), ExamSessionError> {
        self.ensure_in_progress()?;

        let question = self
            .exam
            .question(question_id)
            .ok_or(ExamSessionError::UnknownQuestion(question_id))?;
        if !question.has_option(option_index) {
            return Err(ExamSessionError::InvalidOption {
                question_id,
                option_index,
                option_count: question.option_count(),
            });
        }

        self.answers.insert(question_id, option_index);
        Ok(())
    }

    /// Move to the question at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` after submit/expiry and `IndexOutOfRange` if
    /// `index >= question_count`.
    pub fn go_to_question(&mut self, index: usize) -> Result<&Question, ExamSessionError> {
        self.ensure_in_progress()?;

        let len = self.exam.question_count();
        if index >= len {
            return Err(ExamSessionError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len,
            });
        }

        self.current = index;
        Ok(self.current_question())
    }

    /// Move to the following question.
    ///
    /// # Errors
    ///
    /// Same as `go_to_question`; fails on the last question.
    pub fn next_question(&mut self) -> Result<&Question, ExamSessionError> {
        self.go_to_question(self.current.saturating_add(1))
    }

    /// Move to the preceding question.
    ///
    /// # Errors
    ///
    /// Same as `go_to_question`; fails on the first question.
    pub fn previous_question(&mut self) -> Result<&Question, ExamSessionError> {
        self.ensure_in_progress()?;
        match self.current.checked_sub(1) {
            Some(index) => self.go_to_question(index),
            None => Err(ExamSessionError::IndexOutOfRange {
                index: -1,
                len: self.exam.question_count(),
            }),
        }
    }

    /// Advance the session clock by `delta_secs`.
    ///
    /// Reaching the time limit expires the session and freezes whatever
    /// answers exist. Elapsed time never exceeds the limit.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` after submit/expiry.
    pub fn tick(&mut self, delta_secs: u64) -> Result<TickOutcome, ExamSessionError> {
        self.ensure_in_progress()?;

        let limit = self.exam.time_limit_secs();
        self.elapsed_secs = self.elapsed_secs.saturating_add(delta_secs).min(limit);

        if self.elapsed_secs >= limit {
            let submission = self.freeze(SubmissionKind::Expired);
            return Ok(TickOutcome::Expired(submission));
        }

        Ok(TickOutcome::Running {
            remaining_secs: self.remaining_secs(),
        })
    }

    /// End the session now and freeze the answers.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` if the session was already submitted or
    /// expired; the earlier submission is kept as is.
    pub fn submit(&mut self) -> Result<ExamSubmission, ExamSessionError> {
        self.ensure_in_progress()?;
        Ok(self.freeze(SubmissionKind::Submitted))
    }

    fn freeze(&mut self, kind: SubmissionKind) -> ExamSubmission {
        let answers = self
            .exam
            .questions()
            .iter()
            .filter_map(|question| {
                self.answers
                    .get(&question.id())
                    .map(|&option_index| SelectedAnswer {
                        question_id: question.id(),
                        option_index,
                    })
            })
            .collect();

        let submission = ExamSubmission::new(self.exam.id(), answers, self.elapsed_secs, kind);
        self.status = match kind {
            SubmissionKind::Submitted => SessionStatus::Submitted,
            SubmissionKind::Expired => SessionStatus::Expired,
        };
        self.submission = Some(submission.clone());
        submission
    }
}
