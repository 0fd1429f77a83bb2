use exam_core::model::ExamId;

use super::SqliteRepository;
use super::mapping::{answers_to_json, map_attempt_row, to_i64};
use crate::repository::{AttemptId, AttemptRecord, AttemptRepository, AttemptRow, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let exam_id = to_i64("exam_id", record.exam_id.value())?;
        let answers = answers_to_json(&record.answers)?;

        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    exam_id, kind, answers, correct, total,
                    remaining_seconds, expired, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(exam_id)
        .bind(record.kind.as_str())
        .bind(answers)
        .bind(i64::from(record.correct))
        .bind(i64::from(record.total))
        .bind(i64::from(record.remaining_seconds))
        .bind(i64::from(record.expired))
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn attempts_for_exam(&self, exam_id: ExamId) -> Result<Vec<AttemptRow>, StorageError> {
        let exam = to_i64("exam_id", exam_id.value())?;

        let rows = sqlx::query(
            r"
                SELECT
                    id, exam_id, kind, answers, correct, total,
                    remaining_seconds, expired, submitted_at
                FROM attempts
                WHERE exam_id = ?1
                ORDER BY submitted_at ASC, id ASC
            ",
        )
        .bind(exam)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
