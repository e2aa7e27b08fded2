use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::ServicesConfig;
use crate::dashboard_service::DashboardService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::exams::{CatalogScorer, ExamCatalog, ExamSessionService, RepositoryCatalog, TimerConfig};

/// Assembles app-facing services over one shared storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    timer: TimerConfig,
    catalog: Arc<dyn ExamCatalog>,
    exam_sessions: Arc<ExamSessionService>,
    enrollment: Arc<EnrollmentService>,
    dashboards: Arc<DashboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: &ServicesConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(db = %config.db_url, "services ready on sqlite storage");
        Ok(Self::from_storage(storage, clock, config.timer()))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock, TimerConfig::default())
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, timer: TimerConfig) -> Self {
        let catalog: Arc<dyn ExamCatalog> =
            Arc::new(RepositoryCatalog::new(Arc::clone(&storage.exams)));
        let recorder = Arc::new(CatalogScorer::new(
            Arc::clone(&catalog),
            Arc::clone(&storage.submissions),
        ));
        let exam_sessions = Arc::new(ExamSessionService::new(
            clock,
            Arc::clone(&catalog),
            recorder,
        ));
        let enrollment = EnrollmentService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
        );
        let dashboards = Arc::new(DashboardService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.exams),
            enrollment.clone(),
        ));

        Self {
            storage,
            timer,
            catalog,
            exam_sessions,
            enrollment: Arc::new(enrollment),
            dashboards,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn timer(&self) -> TimerConfig {
        self.timer
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn ExamCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn exam_sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.exam_sessions)
    }

    #[must_use]
    pub fn enrollment(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollment)
    }

    #[must_use]
    pub fn dashboards(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboards)
    }
}
