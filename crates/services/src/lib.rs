#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod dashboard_service;
pub mod enrollment_service;
pub mod error;
pub mod exams;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use config::ServicesConfig;
pub use dashboard_service::{
    AdminDashboard, Dashboard, DashboardService, ExamOverview, StudentDashboard, TaughtCourse,
    TeacherDashboard,
};
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, CatalogError, DashboardError, EnrollmentError, ExamSessionError,
    ScoringError,
};
pub use exams::{
    CatalogScorer, ExamCatalog, ExamCommand, ExamProgress, ExamSession, ExamSessionService,
    RepositoryCatalog, ResultRecorder, SessionStatus, TickOutcome, TickReport, TimerConfig,
    drive_session, run_exam_timer,
};
