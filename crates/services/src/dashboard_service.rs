use std::sync::Arc;

use lms_core::model::{Course, CourseId, Exam, ExamId, Role, UserId};
use storage::repository::{CourseRepository, ExamRepository};

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::DashboardError;

/// Summary of an exam a student can take right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamOverview {
    pub exam_id: ExamId,
    pub course_id: CourseId,
    pub title: String,
    pub question_count: usize,
    pub time_limit_minutes: u32,
    /// Seconds until the exam closes.
    pub closes_in_secs: i64,
}

impl ExamOverview {
    fn new(exam: &Exam, closes_in_secs: i64) -> Self {
        Self {
            exam_id: exam.id(),
            course_id: exam.course_id(),
            title: exam.title().to_string(),
            question_count: exam.question_count(),
            time_limit_minutes: exam.time_limit_minutes(),
            closes_in_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDashboard {
    pub course_count: usize,
    pub exam_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaughtCourse {
    pub course: Course,
    pub exams: Vec<Exam>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherDashboard {
    pub courses: Vec<TaughtCourse>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentDashboard {
    pub enrolled: Vec<Course>,
    pub open_exams: Vec<ExamOverview>,
}

/// Role-specific landing view.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Admin(AdminDashboard),
    Teacher(TeacherDashboard),
    Student(StudentDashboard),
}

impl Dashboard {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Dashboard::Admin(_) => Role::Admin,
            Dashboard::Teacher(_) => Role::Teacher,
            Dashboard::Student(_) => Role::Student,
        }
    }
}

/// Builds dashboards from courses, exams and enrollments.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    exams: Arc<dyn ExamRepository>,
    enrollment: EnrollmentService,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        exams: Arc<dyn ExamRepository>,
        enrollment: EnrollmentService,
    ) -> Self {
        Self {
            clock,
            courses,
            exams,
            enrollment,
        }
    }

    /// Build the dashboard for `user` acting as `role`.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError` on repository failures.
    pub async fn dashboard_for(&self, user: UserId, role: Role) -> Result<Dashboard, DashboardError> {
        tracing::debug!(%user, %role, "building dashboard");
        let dashboard = match role {
            Role::Admin => Dashboard::Admin(self.admin().await?),
            Role::Teacher => Dashboard::Teacher(self.teacher(user).await?),
            Role::Student => Dashboard::Student(self.student(user).await?),
        };
        Ok(dashboard)
    }

    async fn admin(&self) -> Result<AdminDashboard, DashboardError> {
        Ok(AdminDashboard {
            course_count: self.courses.list_courses().await?.len(),
            exam_count: self.exams.list_exams().await?.len(),
        })
    }

    async fn teacher(&self, user: UserId) -> Result<TeacherDashboard, DashboardError> {
        let mut courses = Vec::new();
        for course in self.courses.list_courses().await? {
            if course.instructor() != user {
                continue;
            }
            let exams = self.exams.list_exams_for_course(course.id()).await?;
            courses.push(TaughtCourse { course, exams });
        }
        Ok(TeacherDashboard { courses })
    }

    async fn student(&self, user: UserId) -> Result<StudentDashboard, DashboardError> {
        let enrolled = self.enrollment.enrolled_courses(user).await?;
        let now = self.clock.now();

        let mut open_exams = Vec::new();
        for course in &enrolled {
            open_exams.extend(
                self.exams
                    .list_exams_for_course(course.id())
                    .await?
                    .iter()
                    .filter(|exam| exam.is_open_at(now))
                    .map(|exam| {
                        ExamOverview::new(exam, (exam.available_until() - now).num_seconds())
                    }),
            );
        }

        Ok(StudentDashboard {
            enrolled,
            open_exams,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lms_core::model::{ExamDraft, Question, QuestionId};
    use lms_core::time::{fixed_clock, fixed_now};
    use storage::repository::{EnrollmentRepository, InMemoryRepository};

    fn exam(id: u64, course: u64, from_days: i64, until_days: i64) -> Exam {
        let options = ["yes", "no"].map(String::from).to_vec();
        ExamDraft {
            id: ExamId::new(id),
            course_id: CourseId::new(course),
            title: format!("Exam {id}"),
            description: None,
            time_limit_minutes: 10,
            available_from: fixed_now() + Duration::days(from_days),
            available_until: fixed_now() + Duration::days(until_days),
            questions: vec![Question::new(QuestionId::new(1), "Q", options, 0).unwrap()],
        }
        .validate()
        .unwrap()
    }

    async fn fixture() -> DashboardService {
        let repo = InMemoryRepository::new();
        for (id, instructor) in [(1, 7), (2, 7), (3, 8)] {
            let course = Course::new(
                CourseId::new(id),
                format!("Course {id}"),
                None,
                UserId::new(instructor),
            )
            .unwrap();
            repo.upsert_course(&course).await.unwrap();
        }
        repo.upsert_exam(&exam(1, 1, -1, 2)).await.unwrap();
        repo.upsert_exam(&exam(2, 1, 3, 4)).await.unwrap();
        repo.upsert_exam(&exam(3, 3, -2, 1)).await.unwrap();
        repo.upsert_exam(&exam(4, 2, -5, -1)).await.unwrap();

        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let enrollment = EnrollmentService::new(Arc::clone(&courses), enrollments);
        enrollment.enroll(UserId::new(20), CourseId::new(1)).await.unwrap();
        enrollment.enroll(UserId::new(20), CourseId::new(2)).await.unwrap();

        DashboardService::new(fixed_clock(), courses, Arc::new(repo), enrollment)
    }

    #[tokio::test]
    async fn admin_sees_totals() {
        let service = fixture().await;
        let dashboard = service.dashboard_for(UserId::new(1), Role::Admin).await.unwrap();
        assert_eq!(
            dashboard,
            Dashboard::Admin(AdminDashboard {
                course_count: 3,
                exam_count: 4,
            })
        );
    }

    #[tokio::test]
    async fn teacher_sees_own_courses_with_exams() {
        let service = fixture().await;
        let Dashboard::Teacher(teacher) = service
            .dashboard_for(UserId::new(7), Role::Teacher)
            .await
            .unwrap()
        else {
            panic!("expected teacher dashboard");
        };

        let summary: Vec<(CourseId, Vec<ExamId>)> = teacher
            .courses
            .iter()
            .map(|taught| {
                (
                    taught.course.id(),
                    taught.exams.iter().map(Exam::id).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (CourseId::new(1), vec![ExamId::new(1), ExamId::new(2)]),
                (CourseId::new(2), vec![ExamId::new(4)]),
            ]
        );
    }

    #[tokio::test]
    async fn student_sees_enrolled_courses_and_open_exams() {
        let service = fixture().await;
        let dashboard = service
            .dashboard_for(UserId::new(20), Role::Student)
            .await
            .unwrap();
        assert_eq!(dashboard.role(), Role::Student);
        let Dashboard::Student(student) = dashboard else {
            panic!("expected student dashboard");
        };

        let enrolled: Vec<CourseId> = student.enrolled.iter().map(Course::id).collect();
        assert_eq!(enrolled, vec![CourseId::new(1), CourseId::new(2)]);

        assert_eq!(student.open_exams.len(), 1);
        let open = &student.open_exams[0];
        assert_eq!(open.exam_id, ExamId::new(1));
        assert_eq!(open.question_count, 1);
        assert_eq!(open.closes_in_secs, 2 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn student_without_enrollments_has_empty_dashboard() {
        let service = fixture().await;
        let dashboard = service
            .dashboard_for(UserId::new(99), Role::Student)
            .await
            .unwrap();
        assert_eq!(
            dashboard,
            Dashboard::Student(StudentDashboard {
                enrolled: Vec::new(),
                open_exams: Vec::new(),
            })
        );
    }

    #[tokio::test]
    async fn exam_closing_now_is_open_with_zero_seconds_left() {
        let repo = InMemoryRepository::new();
        let course = Course::new(CourseId::new(1), "Course 1", None, UserId::new(7)).unwrap();
        repo.upsert_course(&course).await.unwrap();
        repo.upsert_exam(&exam(1, 1, -1, 0)).await.unwrap();

        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollment = EnrollmentService::new(Arc::clone(&courses), Arc::new(repo.clone()));
        enrollment.enroll(UserId::new(20), CourseId::new(1)).await.unwrap();
        let service = DashboardService::new(fixed_clock(), courses, Arc::new(repo), enrollment);

        let Dashboard::Student(student) = service
            .dashboard_for(UserId::new(20), Role::Student)
            .await
            .unwrap()
        else {
            panic!("expected student dashboard");
        };
        assert_eq!(student.open_exams.len(), 1);
        assert_eq!(student.open_exams[0].closes_in_secs, 0);
    }
}
