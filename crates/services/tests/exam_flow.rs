use chrono::Duration;
use lms_core::model::{
    Course, CourseId, ExamDraft, ExamId, Question, QuestionId, Role, SubmissionKind, UserId,
};
use lms_core::time::fixed_now;
use services::{AppServices, Clock, Dashboard, ExamSessionError, ServicesConfig, SessionStatus};

const STUDENT: UserId = UserId::new(30);

async fn seed(app: &AppServices) {
    let storage = app.storage();
    let course = Course::new(CourseId::new(1), "Databases", None, UserId::new(2)).unwrap();
    storage.courses.upsert_course(&course).await.unwrap();

    let options = || ["A", "B", "C", "D"].map(String::from).to_vec();
    let exam = ExamDraft {
        id: ExamId::new(1),
        course_id: course.id(),
        title: "Normal forms".into(),
        description: None,
        time_limit_minutes: 1,
        available_from: fixed_now() - Duration::hours(1),
        available_until: fixed_now() + Duration::hours(1),
        questions: vec![
            Question::new(QuestionId::new(1), "1NF?", options(), 2).unwrap(),
            Question::new(QuestionId::new(2), "2NF?", options(), 0).unwrap(),
            Question::new(QuestionId::new(3), "3NF?", options(), 3).unwrap(),
        ],
    }
    .validate()
    .unwrap();
    storage.exams.upsert_exam(&exam).await.unwrap();
}

#[tokio::test]
async fn expiry_records_answers_given_so_far() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    seed(&app).await;
    let exams = app.exam_sessions();

    let mut session = exams.start_exam(ExamId::new(1)).await.unwrap();
    session.select_answer(QuestionId::new(1), 2).unwrap();
    session.next_question().unwrap();
    session.select_answer(QuestionId::new(2), 0).unwrap();

    let report = exams.tick(&mut session, 60).await.unwrap();
    let result = match report {
        services::TickReport::Expired(result) => result,
        other => panic!("expected expiry, got {other:?}"),
    };
    assert_eq!(result.score(), 2);
    assert_eq!(result.total_questions(), 3);

    let submission = session.submission().unwrap();
    assert_eq!(submission.kind(), SubmissionKind::Expired);
    assert_eq!(submission.time_taken_secs(), 60);
    let answered: Vec<(QuestionId, usize)> = submission
        .answers()
        .iter()
        .map(|a| (a.question_id, a.option_index))
        .collect();
    assert_eq!(
        answered,
        vec![(QuestionId::new(1), 2), (QuestionId::new(2), 0)]
    );

    let stored = app
        .storage()
        .submissions
        .get_submission(result.submission_id())
        .await
        .unwrap();
    assert_eq!(&stored, submission);
}

#[tokio::test]
async fn manual_submit_freezes_the_session() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    seed(&app).await;
    let exams = app.exam_sessions();

    let mut session = exams.start_exam(ExamId::new(1)).await.unwrap();
    session.select_answer(QuestionId::new(1), 1).unwrap();
    let result = exams.submit(&mut session).await.unwrap();
    assert_eq!(result.score(), 0);
    assert_eq!(session.status(), SessionStatus::Submitted);

    assert!(matches!(
        session.select_answer(QuestionId::new(2), 0),
        Err(ExamSessionError::AlreadyTerminal(SessionStatus::Submitted))
    ));
    let answers = session.submission().unwrap().answers();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].option_index, 1);
}

#[tokio::test]
async fn closed_exam_cannot_be_started() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now() + Duration::hours(2)));
    seed(&app).await;
    assert!(matches!(
        app.exam_sessions().start_exam(ExamId::new(1)).await,
        Err(ExamSessionError::NotAvailable(_))
    ));
}

#[tokio::test]
async fn enrolled_student_sees_open_exam() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    seed(&app).await;
    app.enrollment()
        .enroll(STUDENT, CourseId::new(1))
        .await
        .unwrap();

    let dashboard = app
        .dashboards()
        .dashboard_for(STUDENT, Role::Student)
        .await
        .unwrap();
    let Dashboard::Student(student) = dashboard else {
        panic!("expected student dashboard");
    };
    assert_eq!(student.enrolled.len(), 1);
    assert_eq!(student.open_exams.len(), 1);
    assert_eq!(student.open_exams[0].exam_id, ExamId::new(1));
    assert_eq!(student.open_exams[0].closes_in_secs, 3600);
}

#[tokio::test]
async fn sqlite_backed_services_record_results() {
    let config = ServicesConfig {
        db_url: "sqlite:file:services_exam_flow?mode=memory&cache=shared".into(),
        ..ServicesConfig::default()
    };
    let app = AppServices::new_sqlite(&config, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    seed(&app).await;

    let exams = app.exam_sessions();
    let mut session = exams.start_exam(ExamId::new(1)).await.unwrap();
    session.select_answer(QuestionId::new(3), 3).unwrap();
    let result = exams.submit(&mut session).await.unwrap();
    assert_eq!(result.score(), 1);

    let listed = app
        .storage()
        .submissions
        .list_results(ExamId::new(1))
        .await
        .unwrap();
    assert_eq!(listed, vec![result]);
}
