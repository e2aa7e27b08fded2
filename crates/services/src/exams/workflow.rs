use std::sync::Arc;

use lms_core::model::{ExamId, ExamResult, ExamSubmission};

use super::catalog::ExamCatalog;
use super::recorder::ResultRecorder;
use super::session::{ExamSession, TickOutcome};
use crate::Clock;
use crate::error::ExamSessionError;

/// What a workflow tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    Running { remaining_secs: u64 },
    /// The time limit was reached and the synthesized submission was scored.
    Expired(ExamResult),
}

/// Starts exam sessions from the catalog and hands finished sessions to the
/// result recorder.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    catalog: Arc<dyn ExamCatalog>,
    recorder: Arc<dyn ResultRecorder>,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn ExamCatalog>,
        recorder: Arc<dyn ResultRecorder>,
    ) -> Self {
        Self {
            clock,
            catalog,
            recorder,
        }
    }

    /// Load an exam and start a session for it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown exam, `NotAvailable` outside the
    /// exam's availability window and `InvalidExam` for an exam without
    /// questions.
    pub async fn start_exam(&self, exam_id: ExamId) -> Result<ExamSession, ExamSessionError> {
        let exam = self.catalog.get_exam(exam_id).await?;
        let now = self.clock.now();
        if !exam.is_open_at(now) {
            tracing::warn!(%exam_id, %now, "exam requested outside its availability window");
            return Err(ExamSessionError::NotAvailable(exam_id));
        }

        let session = ExamSession::start(exam)?;
        tracing::info!(
            %exam_id,
            questions = session.exam().question_count(),
            time_limit_secs = session.exam().time_limit_secs(),
            "exam session started"
        );
        Ok(session)
    }

    /// Submit the session and record the result.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` if the session already ended. A recorder
    /// failure is returned as `Scoring`; the session stays submitted and
    /// `record_frozen` can send it again.
    pub async fn submit(&self, session: &mut ExamSession) -> Result<ExamResult, ExamSessionError> {
        let submission = match session.submit() {
            Ok(submission) => submission,
            Err(err) => {
                tracing::warn!(exam_id = %session.exam_id(), error = %err, "submit rejected");
                return Err(err);
            }
        };
        tracing::info!(
            exam_id = %submission.exam_id(),
            answered = submission.answers().len(),
            elapsed_secs = submission.time_taken_secs(),
            "exam submitted"
        );
        self.record(&submission).await
    }

    /// Advance the session clock, recording the submission if this tick
    /// expired it.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyTerminal` for a finished session and `Scoring` if the
    /// expiry submission could not be recorded.
    pub async fn tick(
        &self,
        session: &mut ExamSession,
        delta_secs: u64,
    ) -> Result<TickReport, ExamSessionError> {
        match session.tick(delta_secs)? {
            TickOutcome::Running { remaining_secs } => Ok(TickReport::Running { remaining_secs }),
            TickOutcome::Expired(submission) => {
                tracing::info!(
                    exam_id = %submission.exam_id(),
                    answered = submission.answers().len(),
                    "exam time limit reached"
                );
                self.record(&submission).await.map(TickReport::Expired)
            }
        }
    }

    /// Send the frozen submission of a finished session to the recorder again.
    ///
    /// # Errors
    ///
    /// Returns `NotFinished` while the session is still in progress.
    pub async fn record_frozen(
        &self,
        session: &ExamSession,
    ) -> Result<ExamResult, ExamSessionError> {
        let submission = session.submission().ok_or(ExamSessionError::NotFinished)?;
        self.record(submission).await
    }

    async fn record(&self, submission: &ExamSubmission) -> Result<ExamResult, ExamSessionError> {
        match self.recorder.record_submission(submission).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(
                    exam_id = %submission.exam_id(),
                    error = %err,
                    "failed to record exam submission"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;
    use crate::exams::SessionStatus;
    use crate::exams::catalog::RepositoryCatalog;
    use crate::exams::recorder::CatalogScorer;
    use async_trait::async_trait;
    use chrono::Duration;
    use lms_core::model::{
        CourseId, ExamDraft, Question, QuestionId, SubmissionKind,
    };
    use lms_core::time::{fixed_clock, fixed_now};
    use std::sync::Mutex;
    use storage::repository::{
        ExamRepository, InMemoryRepository, StorageError, SubmissionRepository,
    };

    fn build_exam(id: u64, from_days: i64, until_days: i64) -> lms_core::model::Exam {
        let options = || ["A", "B", "C", "D"].map(String::from).to_vec();
        ExamDraft {
            id: ExamId::new(id),
            course_id: CourseId::new(1),
            title: format!("Exam {id}"),
            description: None,
            time_limit_minutes: 1,
            available_from: fixed_now() + Duration::days(from_days),
            available_until: fixed_now() + Duration::days(until_days),
            questions: vec![
                Question::new(QuestionId::new(1), "Q1", options(), 2).unwrap(),
                Question::new(QuestionId::new(2), "Q2", options(), 0).unwrap(),
                Question::new(QuestionId::new(3), "Q3", options(), 1).unwrap(),
            ],
        }
        .validate()
        .unwrap()
    }

    async fn service() -> (ExamSessionService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        repo.upsert_exam(&build_exam(1, -1, 1)).await.unwrap();
        repo.upsert_exam(&build_exam(2, 1, 2)).await.unwrap();

        let catalog: Arc<dyn ExamCatalog> = Arc::new(RepositoryCatalog::new(Arc::new(repo.clone())));
        let recorder = Arc::new(CatalogScorer::new(Arc::clone(&catalog), Arc::new(repo.clone())));
        (ExamSessionService::new(fixed_clock(), catalog, recorder), repo)
    }

    #[tokio::test]
    async fn start_checks_catalog_and_window() {
        let (service, _repo) = service().await;

        let session = service.start_exam(ExamId::new(1)).await.unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);

        assert!(matches!(
            service.start_exam(ExamId::new(2)).await,
            Err(ExamSessionError::NotAvailable(id)) if id == ExamId::new(2)
        ));
        assert!(matches!(
            service.start_exam(ExamId::new(9)).await,
            Err(ExamSessionError::NotFound(id)) if id == ExamId::new(9)
        ));
    }

    #[tokio::test]
    async fn submit_records_a_scored_result() {
        let (service, repo) = service().await;
        let mut session = service.start_exam(ExamId::new(1)).await.unwrap();
        session.select_answer(QuestionId::new(1), 2).unwrap();
        session.select_answer(QuestionId::new(2), 3).unwrap();

        let result = service.submit(&mut session).await.unwrap();
        assert_eq!(result.score(), 1);
        assert_eq!(result.total_questions(), 3);
        assert_eq!(session.status(), SessionStatus::Submitted);

        let stored = repo.get_submission(result.submission_id()).await.unwrap();
        assert_eq!(stored.kind(), SubmissionKind::Submitted);

        assert!(matches!(
            service.submit(&mut session).await,
            Err(ExamSessionError::AlreadyTerminal(SessionStatus::Submitted))
        ));
    }

    #[tokio::test]
    async fn tick_past_limit_records_expired_submission() {
        let (service, repo) = service().await;
        let mut session = service.start_exam(ExamId::new(1)).await.unwrap();
        session.select_answer(QuestionId::new(3), 1).unwrap();

        assert_eq!(
            service.tick(&mut session, 59).await.unwrap(),
            TickReport::Running { remaining_secs: 1 }
        );
        let result = match service.tick(&mut session, 5).await.unwrap() {
            TickReport::Expired(result) => result,
            other => panic!("expected expiry, got {other:?}"),
        };
        assert_eq!(result.score(), 1);

        let stored = repo.get_submission(result.submission_id()).await.unwrap();
        assert_eq!(stored.kind(), SubmissionKind::Expired);
        assert_eq!(stored.time_taken_secs(), 60);
    }

    #[tokio::test]
    async fn record_frozen_requires_a_finished_session() {
        let (service, _repo) = service().await;
        let session = service.start_exam(ExamId::new(1)).await.unwrap();
        assert!(matches!(
            service.record_frozen(&session).await,
            Err(ExamSessionError::NotFinished)
        ));
    }

    struct FlakyRecorder {
        fail_next: Mutex<bool>,
    }

    #[async_trait]
    impl ResultRecorder for FlakyRecorder {
        async fn record_submission(
            &self,
            submission: &ExamSubmission,
        ) -> Result<ExamResult, ScoringError> {
            let fail = {
                let mut guard = self.fail_next.lock().unwrap();
                std::mem::replace(&mut *guard, false)
            };
            if fail {
                return Err(ScoringError::Storage(StorageError::Connection(
                    "offline".into(),
                )));
            }
            let grade = lms_core::model::Grade {
                score: 0,
                total_questions: 3,
                outcomes: Vec::new(),
            };
            Ok(ExamResult::new(
                lms_core::model::SubmissionId::new(7),
                submission.exam_id(),
                grade,
            ))
        }
    }

    #[tokio::test]
    async fn failed_recording_can_be_resent() {
        let repo = InMemoryRepository::new();
        repo.upsert_exam(&build_exam(1, -1, 1)).await.unwrap();
        let catalog: Arc<dyn ExamCatalog> = Arc::new(RepositoryCatalog::new(Arc::new(repo)));
        let recorder = Arc::new(FlakyRecorder {
            fail_next: Mutex::new(true),
        });
        let service = ExamSessionService::new(fixed_clock(), catalog, recorder);

        let mut session = service.start_exam(ExamId::new(1)).await.unwrap();
        session.select_answer(QuestionId::new(1), 0).unwrap();
        assert!(matches!(
            service.submit(&mut session).await,
            Err(ExamSessionError::Scoring(_))
        ));
        assert_eq!(session.status(), SessionStatus::Submitted);

        let result = service.record_frozen(&session).await.unwrap();
        assert_eq!(result.submission_id().value(), 7);
    }
}
