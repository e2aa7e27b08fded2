mod course;
mod exam;
mod ids;
mod role;
mod submission;

pub use ids::{CourseId, ExamId, ParseIdError, QuestionId, SubmissionId, UserId};

pub use course::{Course, CourseError};
pub use exam::{Exam, ExamDraft, ExamError, MIN_OPTIONS, Question};
pub use role::{ParseRoleError, Role};
pub use submission::{
    AnswerOutcome, ExamResult, ExamSubmission, Grade, GradingError, ParseSubmissionKindError,
    SelectedAnswer, SubmissionKind,
};
