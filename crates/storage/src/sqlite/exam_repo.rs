use std::collections::HashMap;

use lms_core::model::{CourseId, Exam, ExamId, Question};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_exam_row, map_question_row, ser, to_json, usize_to_i64};
use crate::repository::{ExamRepository, StorageError};

const EXAM_COLUMNS: &str =
    "id, course_id, title, description, time_limit_minutes, available_from, available_until";

impl SqliteRepository {
    /// Loads questions for the given exams, grouped by exam id and in position order.
    async fn questions_by_exam(
        &self,
        exam_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Question>>, StorageError> {
        if exam_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sql = String::from(
            r"
                SELECT exam_id, id, position, prompt, options, correct_option
                FROM questions
                WHERE exam_id IN (
            ",
        );
        for i in 0..exam_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n ORDER BY exam_id ASC, position ASC");

        let mut query = sqlx::query(&sql);
        for id in exam_ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut grouped: HashMap<i64, Vec<Question>> = HashMap::new();
        for row in rows {
            let exam_id: i64 = row.try_get("exam_id").map_err(ser)?;
            grouped
                .entry(exam_id)
                .or_default()
                .push(map_question_row(&row)?);
        }
        Ok(grouped)
    }

    async fn exams_from_rows(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<Exam>, StorageError> {
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<i64, _>("id").map_err(ser)?);
        }
        let mut questions = self.questions_by_exam(&ids).await?;

        let mut exams = Vec::with_capacity(rows.len());
        for (row, id) in rows.iter().zip(ids) {
            let exam_questions = questions.remove(&id).unwrap_or_default();
            exams.push(map_exam_row(row, exam_questions)?);
        }
        Ok(exams)
    }
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let exam_id = id_i64("exam_id", exam.id().value())?;
        let course_id = id_i64("course_id", exam.course_id().value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO exams (id, course_id, title, description, time_limit_minutes, available_from, available_until)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                time_limit_minutes = excluded.time_limit_minutes,
                available_from = excluded.available_from,
                available_until = excluded.available_until
            ",
        )
        .bind(exam_id)
        .bind(course_id)
        .bind(exam.title())
        .bind(exam.description())
        .bind(i64::from(exam.time_limit_minutes()))
        .bind(exam.available_from())
        .bind(exam.available_until())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM questions WHERE exam_id = ?1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in exam.questions().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO questions (exam_id, id, position, prompt, options, correct_option)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(exam_id)
            .bind(id_i64("question_id", question.id().value())?)
            .bind(usize_to_i64("position", position)?)
            .bind(question.prompt())
            .bind(to_json(question.options())?)
            .bind(usize_to_i64("correct_option", question.correct_option())?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("exam_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let mut exams = self.exams_from_rows(vec![row]).await?;
        exams.pop().ok_or(StorageError::NotFound)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        self.exams_from_rows(rows).await
    }

    async fn list_exams_for_course(&self, course_id: CourseId) -> Result<Vec<Exam>, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE course_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(id_i64("course_id", course_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        self.exams_from_rows(rows).await
    }
}
