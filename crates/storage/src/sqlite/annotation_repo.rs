use exam_core::model::{Annotation, AnnotationId, ContextKey};

use super::SqliteRepository;
use super::mapping::{map_annotation_row, to_i64};
use crate::repository::{AnnotationRepository, StorageError};

#[async_trait::async_trait]
impl AnnotationRepository for SqliteRepository {
    async fn save_annotation(&self, annotation: &Annotation) -> Result<(), StorageError> {
        let start = to_i64("start_offset", annotation.start_offset())?;
        let end = to_i64("end_offset", annotation.end_offset())?;

        sqlx::query(
            r"
            INSERT INTO annotations (id, context_key, text, note, color, start_offset, end_offset, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                note = excluded.note,
                color = excluded.color
            ",
        )
        .bind(annotation.id().to_string())
        .bind(annotation.context_key().as_str())
        .bind(annotation.text())
        .bind(annotation.note())
        .bind(annotation.color().as_str())
        .bind(start)
        .bind(end)
        .bind(annotation.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn delete_annotation(
        &self,
        context_key: &ContextKey,
        id: AnnotationId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM annotations WHERE context_key = ?1 AND id = ?2")
            .bind(context_key.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn annotations_for_context(
        &self,
        context_key: &ContextKey,
    ) -> Result<Vec<Annotation>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, context_key, text, note, color, start_offset, end_offset, created_at
                FROM annotations
                WHERE context_key = ?1
                ORDER BY seq ASC
            ",
        )
        .bind(context_key.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_annotation_row(&row)?);
        }
        Ok(out)
    }
}
