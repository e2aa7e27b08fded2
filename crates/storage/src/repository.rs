use async_trait::async_trait;
use lms_core::model::{
    Course, CourseId, Exam, ExamId, ExamResult, ExamSubmission, Grade, SubmissionId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key under which a user's enrolled course ids are stored.
#[must_use]
pub fn enrollment_key(user: UserId) -> String {
    format!("enrollments:user:{user}")
}

/// Repository contract for the exam catalog.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist or replace an exam together with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// Fetch an exam by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError>;

    /// List every exam, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError>;

    /// List the exams that belong to a course, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_exams_for_course(&self, course_id: CourseId) -> Result<Vec<Exam>, StorageError>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError>;

    /// List every course, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;
}

/// Append-only store of graded submissions.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Store a submission with its grade and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the submission cannot be stored.
    async fn append_submission(
        &self,
        submission: &ExamSubmission,
        grade: &Grade,
    ) -> Result<SubmissionId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_submission(&self, id: SubmissionId) -> Result<ExamSubmission, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: SubmissionId) -> Result<ExamResult, StorageError>;

    /// Results recorded for an exam, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_results(&self, exam_id: ExamId) -> Result<Vec<ExamResult>, StorageError>;
}

/// Key/value store of ordered string lists, kept as serialized text.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Load the list stored under `key`; a missing key is an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored text is not a list of strings.
    async fn load_list(&self, key: &str) -> Result<Vec<String>, StorageError>;

    /// Replace the list stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the list cannot be stored.
    async fn store_list(&self, key: &str, items: &[String]) -> Result<(), StorageError>;
}

pub(crate) fn encode_list(items: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(items).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub(crate) fn decode_list(text: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[derive(Debug, Clone)]
struct StoredSubmission {
    submission: ExamSubmission,
    result: ExamResult,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    submissions: Arc<Mutex<Vec<StoredSubmission>>>,
    lists: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        let mut exams: Vec<Exam> = guard.values().cloned().collect();
        exams.sort_by_key(Exam::id);
        Ok(exams)
    }

    async fn list_exams_for_course(&self, course_id: CourseId) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        let mut exams: Vec<Exam> = guard
            .values()
            .filter(|exam| exam.course_id() == course_id)
            .cloned()
            .collect();
        exams.sort_by_key(Exam::id);
        Ok(exams)
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by_key(Course::id);
        Ok(courses)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn append_submission(
        &self,
        submission: &ExamSubmission,
        grade: &Grade,
    ) -> Result<SubmissionId, StorageError> {
        let mut guard = self.submissions.lock().map_err(poisoned)?;
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("submission id overflow".into()))?
            + 1;
        let id = SubmissionId::new(next);
        guard.push(StoredSubmission {
            submission: submission.clone(),
            result: ExamResult::new(id, submission.exam_id(), grade.clone()),
        });
        Ok(id)
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<ExamSubmission, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|stored| stored.result.submission_id() == id)
            .map(|stored| stored.submission.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn get_result(&self, id: SubmissionId) -> Result<ExamResult, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|stored| stored.result.submission_id() == id)
            .map(|stored| stored.result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, exam_id: ExamId) -> Result<Vec<ExamResult>, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|stored| stored.result.exam_id() == exam_id)
            .map(|stored| stored.result.clone())
            .collect())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn load_list(&self, key: &str) -> Result<Vec<String>, StorageError> {
        let guard = self.lists.lock().map_err(poisoned)?;
        match guard.get(key) {
            Some(text) => decode_list(text),
            None => Ok(Vec::new()),
        }
    }

    async fn store_list(&self, key: &str, items: &[String]) -> Result<(), StorageError> {
        let text = encode_list(items)?;
        let mut guard = self.lists.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), text);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            exams,
            courses,
            submissions,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lms_core::model::{
        ExamDraft, Question, QuestionId, SelectedAnswer, SubmissionKind,
    };
    use lms_core::time::fixed_now;

    fn build_exam(id: u64, course: u64) -> Exam {
        let options = ["A", "B", "C", "D"].map(String::from).to_vec();
        ExamDraft {
            id: ExamId::new(id),
            course_id: CourseId::new(course),
            title: format!("Exam {id}"),
            description: None,
            time_limit_minutes: 10,
            available_from: fixed_now(),
            available_until: fixed_now() + Duration::days(1),
            questions: vec![Question::new(QuestionId::new(1), "Q", options, 1).unwrap()],
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn lists_exams_per_course_in_id_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_exam(&build_exam(3, 1)).await.unwrap();
        repo.upsert_exam(&build_exam(1, 1)).await.unwrap();
        repo.upsert_exam(&build_exam(2, 2)).await.unwrap();

        let ids: Vec<ExamId> = repo
            .list_exams_for_course(CourseId::new(1))
            .await
            .unwrap()
            .iter()
            .map(Exam::id)
            .collect();
        assert_eq!(ids, vec![ExamId::new(1), ExamId::new(3)]);
        assert!(matches!(
            repo.get_exam(ExamId::new(9)).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn submissions_get_sequential_ids() {
        let repo = InMemoryRepository::new();
        let submission = ExamSubmission::new(
            ExamId::new(1),
            vec![SelectedAnswer {
                question_id: QuestionId::new(1),
                option_index: 1,
            }],
            30,
            SubmissionKind::Submitted,
        );
        let grade = Grade::compute(&build_exam(1, 1), &submission).unwrap();

        let first = repo.append_submission(&submission, &grade).await.unwrap();
        let second = repo.append_submission(&submission, &grade).await.unwrap();
        assert_eq!(first, SubmissionId::new(1));
        assert_eq!(second, SubmissionId::new(2));

        let result = repo.get_result(second).await.unwrap();
        assert_eq!(result.score(), 1);
        assert_eq!(repo.get_submission(first).await.unwrap(), submission);
        assert_eq!(repo.list_results(ExamId::new(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lists_are_stored_as_text_and_missing_keys_are_empty() {
        let repo = InMemoryRepository::new();
        let key = enrollment_key(UserId::new(4));
        assert_eq!(key, "enrollments:user:4");
        assert!(repo.load_list(&key).await.unwrap().is_empty());

        let items = vec!["2".to_string(), "1".to_string()];
        repo.store_list(&key, &items).await.unwrap();
        assert_eq!(repo.load_list(&key).await.unwrap(), items);

        let stored = repo.lists.lock().unwrap().get(&key).cloned().unwrap();
        assert_eq!(stored, r#"["2","1"]"#);
    }

    #[tokio::test]
    async fn corrupt_list_text_is_a_serialization_error() {
        let repo = InMemoryRepository::new();
        repo.lists
            .lock()
            .unwrap()
            .insert("broken".into(), "not json".into());
        assert!(matches!(
            repo.load_list("broken").await,
            Err(StorageError::Serialization(_))
        ));
    }
}
