use std::sync::Arc;

use async_trait::async_trait;
use lms_core::model::{Exam, ExamId};
use storage::repository::{ExamRepository, StorageError};

use crate::error::CatalogError;

/// Read-only source of exam definitions.
#[async_trait]
pub trait ExamCatalog: Send + Sync {
    /// Look up an exam by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the catalog has no such exam.
    async fn get_exam(&self, exam_id: ExamId) -> Result<Exam, CatalogError>;
}

/// Serves the catalog straight from an `ExamRepository`.
#[derive(Clone)]
pub struct RepositoryCatalog {
    exams: Arc<dyn ExamRepository>,
}

impl RepositoryCatalog {
    #[must_use]
    pub fn new(exams: Arc<dyn ExamRepository>) -> Self {
        Self { exams }
    }
}

#[async_trait]
impl ExamCatalog for RepositoryCatalog {
    async fn get_exam(&self, exam_id: ExamId) -> Result<Exam, CatalogError> {
        match self.exams.get_exam(exam_id).await {
            Ok(exam) => Ok(exam),
            Err(StorageError::NotFound) => Err(CatalogError::NotFound(exam_id)),
            Err(e) => Err(CatalogError::Storage(e)),
        }
    }
}
