//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{CourseId, ExamId, GradingError, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::exams::SessionStatus;

/// Errors emitted by an `ExamCatalog`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("exam {0} not found")]
    NotFound(ExamId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by a `ResultRecorder`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exam sessions and the exam session workflow.
///
/// Every variant leaves the session it was raised for unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamSessionError {
    #[error("exam {0} has no questions")]
    InvalidExam(ExamId),
    #[error("option {option_index} is not valid for question {question_id} ({option_count} options)")]
    InvalidOption {
        question_id: QuestionId,
        option_index: usize,
        option_count: usize,
    },
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),
    #[error("question index {index} is outside 0..{len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("session already {0}")]
    AlreadyTerminal(SessionStatus),
    #[error("session is still in progress")]
    NotFinished,
    #[error("exam {0} not found")]
    NotFound(ExamId),
    #[error("exam {0} is not open at this time")]
    NotAvailable(ExamId),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<CatalogError> for ExamSessionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::NotFound(id),
            CatalogError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
