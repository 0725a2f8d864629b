use chrono::Utc;
use sqlx::Row;
use toeic_core::model::{ExamDefinition, ExamId, ExamSummary};

use super::SqliteRepository;
use super::mapping::{
    exam_id_from_i64, exam_id_to_i64, map_question_row, options_to_json, question_id_to_i64, ser,
};
use crate::repository::{ExamRepository, ExamWriter, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn get_exam(&self, id: ExamId) -> Result<Option<ExamDefinition>, StorageError> {
        let exam_id = exam_id_to_i64(id)?;
        let Some(row) = sqlx::query(
            "SELECT id, title, description, time_budget_minutes FROM exams WHERE id = ?1",
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r"
            SELECT id, part, prompt, image, audio, passage, options, correct, explanation
            FROM questions
            WHERE exam_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            questions.push(map_question_row(row)?);
        }

        let budget = u32::try_from(row.try_get::<i64, _>("time_budget_minutes").map_err(ser)?)
            .map_err(|_| ser("time_budget_minutes overflow"))?;
        ExamDefinition::new(
            exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            row.try_get::<Option<String>, _>("description").map_err(ser)?,
            questions,
        )
        .and_then(|exam| exam.with_time_budget(budget))
        .map(Some)
        .map_err(ser)
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StorageError> {
        let ids = sqlx::query("SELECT id FROM exams ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(ids.len());
        for row in ids {
            let id = exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
            if let Some(exam) = self.get_exam(id).await? {
                out.push(exam.summary());
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ExamWriter for SqliteRepository {
    async fn upsert_exam(&self, exam: &ExamDefinition) -> Result<(), StorageError> {
        let exam_id = exam_id_to_i64(exam.id())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO exams (id, title, description, time_budget_minutes, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                time_budget_minutes = excluded.time_budget_minutes,
                updated_at = excluded.updated_at
            ",
        )
        .bind(exam_id)
        .bind(exam.title())
        .bind(exam.description())
        .bind(i64::from(exam.time_budget_minutes()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // The question list is replaced wholesale so removed questions disappear.
        sqlx::query("DELETE FROM questions WHERE exam_id = ?1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, q) in exam.questions().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO questions (
                    exam_id, id, position, part, prompt, image, audio, passage,
                    options, correct, explanation
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ",
            )
            .bind(exam_id)
            .bind(question_id_to_i64(q.id())?)
            .bind(i64::try_from(position).map_err(|_| ser("position overflow"))?)
            .bind(i64::from(q.part().number()))
            .bind(q.prompt())
            .bind(q.image().map(|m| m.as_str().to_owned()))
            .bind(q.audio().map(|m| m.as_str().to_owned()))
            .bind(q.passage())
            .bind(options_to_json(q.options())?)
            .bind(q.correct().to_string())
            .bind(q.explanation())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM exams WHERE id = ?1")
            .bind(exam_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
