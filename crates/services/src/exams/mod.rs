mod catalog;
mod progress;
mod recorder;
mod session;
mod timer;
mod workflow;

pub use catalog::{ExamCatalog, RepositoryCatalog};
pub use progress::ExamProgress;
pub use recorder::{CatalogScorer, ResultRecorder};
pub use session::{ExamSession, SessionStatus, TickOutcome};
pub use timer::{ExamCommand, TimerConfig, drive_session, run_exam_timer};
pub use workflow::{ExamSessionService, TickReport};
