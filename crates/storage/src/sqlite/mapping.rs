use lms_core::model::{
    Course, CourseId, Exam, ExamDraft, ExamId, Question, QuestionId, SubmissionId, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn submission_id_from_i64(v: i64) -> Result<SubmissionId, StorageError> {
    Ok(SubmissionId::new(i64_to_u64("submission_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, StorageError> {
    serde_json::from_str(text).map_err(ser)
}

pub(crate) fn map_course_row(row: &sqlx::sqlite::SqliteRow) -> Result<Course, StorageError> {
    let id = course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let instructor = UserId::new(i64_to_u64(
        "instructor_id",
        row.try_get::<i64, _>("instructor_id").map_err(ser)?,
    )?);

    Course::new(
        id,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        instructor,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64(
        "question_id",
        row.try_get::<i64, _>("id").map_err(ser)?,
    )?);
    let options: Vec<String> = from_json(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let correct_option = usize_from_i64(
        "correct_option",
        row.try_get::<i64, _>("correct_option").map_err(ser)?,
    )?;

    Question::new(
        id,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        options,
        correct_option,
    )
    .map_err(ser)
}

/// Builds an `Exam` from an `exams` row and its questions, already in position order.
pub(crate) fn map_exam_row(
    row: &sqlx::sqlite::SqliteRow,
    questions: Vec<Question>,
) -> Result<Exam, StorageError> {
    ExamDraft {
        id: exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        time_limit_minutes: u32_from_i64(
            "time_limit_minutes",
            row.try_get::<i64, _>("time_limit_minutes").map_err(ser)?,
        )?,
        available_from: row.try_get("available_from").map_err(ser)?,
        available_until: row.try_get("available_until").map_err(ser)?,
        questions,
    }
    .validate()
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_rejected() {
        assert!(matches!(
            exam_id_from_i64(-1),
            Err(StorageError::Serialization(_))
        ));
        assert_eq!(course_id_from_i64(7).unwrap(), CourseId::new(7));
    }

    #[test]
    fn oversized_ids_do_not_wrap() {
        assert!(id_i64("exam_id", u64::MAX).is_err());
        assert_eq!(id_i64("exam_id", 12).unwrap(), 12);
    }
}
