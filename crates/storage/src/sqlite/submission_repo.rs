use lms_core::model::{
    AnswerOutcome, ExamId, ExamResult, ExamSubmission, Grade, SelectedAnswer, SubmissionId,
    SubmissionKind,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, exam_id_from_i64, from_json, id_i64, ser, submission_id_from_i64, to_json,
    u32_from_i64,
};
use crate::repository::{StorageError, SubmissionRepository};

fn map_submission_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamSubmission, StorageError> {
    let exam_id = exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?;
    let kind: SubmissionKind = row
        .try_get::<String, _>("kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let time_taken_secs = u64::try_from(row.try_get::<i64, _>("time_taken_secs").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid time_taken_secs".into()))?;
    let answers: Vec<SelectedAnswer> =
        from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?;

    Ok(ExamSubmission::new(exam_id, answers, time_taken_secs, kind))
}

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamResult, StorageError> {
    let id = submission_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let exam_id = exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?;
    let outcomes: Vec<AnswerOutcome> =
        from_json(&row.try_get::<String, _>("outcomes").map_err(ser)?)?;
    let grade = Grade {
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        outcomes,
    };

    Ok(ExamResult::new(id, exam_id, grade))
}

#[async_trait::async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn append_submission(
        &self,
        submission: &ExamSubmission,
        grade: &Grade,
    ) -> Result<SubmissionId, StorageError> {
        let time_taken = i64::try_from(submission.time_taken_secs())
            .map_err(|_| StorageError::Serialization("time_taken_secs overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO submissions (
                    exam_id, kind, time_taken_secs, answers,
                    score, total_questions, outcomes
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("exam_id", submission.exam_id().value())?)
        .bind(submission.kind().as_str())
        .bind(time_taken)
        .bind(to_json(submission.answers())?)
        .bind(i64::from(grade.score))
        .bind(i64::from(grade.total_questions))
        .bind(to_json(&grade.outcomes)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        submission_id_from_i64(res.last_insert_rowid())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<ExamSubmission, StorageError> {
        let row = sqlx::query(
            r"
                SELECT exam_id, kind, time_taken_secs, answers
                FROM submissions
                WHERE id = ?1
            ",
        )
        .bind(id_i64("submission_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_submission_row(&row)
    }

    async fn get_result(&self, id: SubmissionId) -> Result<ExamResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, exam_id, score, total_questions, outcomes
                FROM submissions
                WHERE id = ?1
            ",
        )
        .bind(id_i64("submission_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(&self, exam_id: ExamId) -> Result<Vec<ExamResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, exam_id, score, total_questions, outcomes
                FROM submissions
                WHERE exam_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("exam_id", exam_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
