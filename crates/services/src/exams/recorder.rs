use std::sync::Arc;

use async_trait::async_trait;
use lms_core::model::{ExamResult, ExamSubmission, Grade};
use storage::repository::SubmissionRepository;

use super::catalog::ExamCatalog;
use crate::error::ScoringError;

/// Accepts finished submissions and returns their score.
#[async_trait]
pub trait ResultRecorder: Send + Sync {
    /// Score and store a submission.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError` if the submission cannot be graded or stored.
    async fn record_submission(
        &self,
        submission: &ExamSubmission,
    ) -> Result<ExamResult, ScoringError>;
}

/// Grades submissions against the catalog's answer key and appends them to
/// a `SubmissionRepository`, which assigns the submission id.
#[derive(Clone)]
pub struct CatalogScorer {
    catalog: Arc<dyn ExamCatalog>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl CatalogScorer {
    #[must_use]
    pub fn new(catalog: Arc<dyn ExamCatalog>, submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self {
            catalog,
            submissions,
        }
    }
}

#[async_trait]
impl ResultRecorder for CatalogScorer {
    async fn record_submission(
        &self,
        submission: &ExamSubmission,
    ) -> Result<ExamResult, ScoringError> {
        let exam = self.catalog.get_exam(submission.exam_id()).await?;
        let grade = Grade::compute(&exam, submission)?;
        let submission_id = self.submissions.append_submission(submission, &grade).await?;

        tracing::info!(
            exam_id = %exam.id(),
            submission_id = %submission_id,
            score = grade.score,
            total = grade.total_questions,
            kind = %submission.kind(),
            "recorded exam submission"
        );

        Ok(ExamResult::new(submission_id, exam.id(), grade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::exams::catalog::RepositoryCatalog;
    use chrono::Duration;
    use lms_core::model::{
        CourseId, ExamDraft, ExamId, GradingError, Question, QuestionId, SelectedAnswer,
        SubmissionKind,
    };
    use lms_core::time::fixed_now;
    use storage::repository::{ExamRepository, InMemoryRepository};

    async fn scorer_with_exam() -> (CatalogScorer, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let options = || ["A", "B", "C", "D"].map(String::from).to_vec();
        let exam = ExamDraft {
            id: ExamId::new(1),
            course_id: CourseId::new(1),
            title: "Quiz".into(),
            description: None,
            time_limit_minutes: 1,
            available_from: fixed_now(),
            available_until: fixed_now() + Duration::days(1),
            questions: vec![
                Question::new(QuestionId::new(1), "Q1", options(), 2).unwrap(),
                Question::new(QuestionId::new(2), "Q2", options(), 0).unwrap(),
            ],
        }
        .validate()
        .unwrap();
        repo.upsert_exam(&exam).await.unwrap();

        let catalog = Arc::new(RepositoryCatalog::new(Arc::new(repo.clone())));
        (CatalogScorer::new(catalog, Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn scores_and_stores_submission() {
        let (scorer, repo) = scorer_with_exam().await;
        let submission = ExamSubmission::new(
            ExamId::new(1),
            vec![
                SelectedAnswer {
                    question_id: QuestionId::new(1),
                    option_index: 2,
                },
                SelectedAnswer {
                    question_id: QuestionId::new(2),
                    option_index: 0,
                },
            ],
            40,
            SubmissionKind::Submitted,
        );

        let result = scorer.record_submission(&submission).await.unwrap();
        assert_eq!(result.score(), 2);
        assert_eq!(result.total_questions(), 2);
        assert!(result.outcomes().iter().all(|o| o.correct));

        let stored = repo.get_result(result.submission_id()).await.unwrap();
        assert_eq!(stored, result);
    }

    #[tokio::test]
    async fn missing_exam_is_a_catalog_error() {
        let (scorer, _repo) = scorer_with_exam().await;
        let submission =
            ExamSubmission::new(ExamId::new(2), Vec::new(), 0, SubmissionKind::Expired);
        let err = scorer.record_submission(&submission).await.unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Catalog(CatalogError::NotFound(id)) if id == ExamId::new(2)
        ));
    }

    #[tokio::test]
    async fn ungradable_submission_is_not_stored() {
        let (scorer, repo) = scorer_with_exam().await;
        let submission = ExamSubmission::new(
            ExamId::new(1),
            vec![SelectedAnswer {
                question_id: QuestionId::new(9),
                option_index: 0,
            }],
            5,
            SubmissionKind::Submitted,
        );
        let err = scorer.record_submission(&submission).await.unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Grading(GradingError::UnknownQuestion(_))
        ));
        assert!(repo.list_results(ExamId::new(1)).await.unwrap().is_empty());
    }
}
