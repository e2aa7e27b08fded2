use std::sync::Arc;

use lms_core::model::{Course, CourseId, UserId};
use storage::repository::{CourseRepository, EnrollmentRepository, StorageError, enrollment_key};

use crate::error::EnrollmentError;

/// Tracks which courses a user is enrolled in.
///
/// Enrollments are kept as an ordered list of course ids per user, in the
/// order the user first enrolled.
#[derive(Clone)]
pub struct EnrollmentService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            courses,
            enrollments,
        }
    }

    /// Enroll a user in a course. Enrolling twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound` if the course does not exist.
    pub async fn enroll(&self, user: UserId, course: CourseId) -> Result<(), EnrollmentError> {
        match self.courses.get_course(course).await {
            Ok(_) => {}
            Err(StorageError::NotFound) => return Err(EnrollmentError::CourseNotFound(course)),
            Err(e) => return Err(e.into()),
        }

        let key = enrollment_key(user);
        let mut ids = self.enrollments.load_list(&key).await?;
        let raw = course.to_string();
        if ids.contains(&raw) {
            return Ok(());
        }
        ids.push(raw);
        self.enrollments.store_list(&key, &ids).await?;

        tracing::info!(%user, %course, "user enrolled in course");
        Ok(())
    }

    /// Remove a course from the user's enrollments if present.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Storage` on repository failures.
    pub async fn unenroll(&self, user: UserId, course: CourseId) -> Result<(), EnrollmentError> {
        let key = enrollment_key(user);
        let mut ids = self.enrollments.load_list(&key).await?;
        let raw = course.to_string();
        let before = ids.len();
        ids.retain(|id| *id != raw);
        if ids.len() != before {
            self.enrollments.store_list(&key, &ids).await?;
            tracing::info!(%user, %course, "user unenrolled from course");
        }
        Ok(())
    }

    /// Course ids the user is enrolled in, in enrollment order.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Storage` on repository failures or if a
    /// stored id cannot be parsed.
    pub async fn enrolled_course_ids(&self, user: UserId) -> Result<Vec<CourseId>, EnrollmentError> {
        let ids = self.enrollments.load_list(&enrollment_key(user)).await?;
        ids.iter()
            .map(|raw| {
                raw.parse::<CourseId>()
                    .map_err(|e| EnrollmentError::Storage(StorageError::Serialization(e.to_string())))
            })
            .collect()
    }

    /// # Errors
    ///
    /// Same as `enrolled_course_ids`.
    pub async fn is_enrolled(&self, user: UserId, course: CourseId) -> Result<bool, EnrollmentError> {
        Ok(self.enrolled_course_ids(user).await?.contains(&course))
    }

    /// Courses the user is enrolled in. Ids whose course has since been
    /// removed are skipped.
    ///
    /// # Errors
    ///
    /// Same as `enrolled_course_ids`.
    pub async fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, EnrollmentError> {
        let mut courses = Vec::new();
        for id in self.enrolled_course_ids(user).await? {
            match self.courses.get_course(id).await {
                Ok(course) => courses.push(course),
                Err(StorageError::NotFound) => {
                    tracing::debug!(%user, course = %id, "skipping enrollment for missing course");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(courses)
    }
}
