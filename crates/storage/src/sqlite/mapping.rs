use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use exam_core::model::{Annotation, AnnotationId, ContextKey, ExamId, ExamKind, HighlightColor};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AttemptRecord, AttemptRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn to_i64<T: TryInto<i64>>(field: &'static str, v: T) -> Result<i64, StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn from_i64<T: TryFrom<i64>>(field: &'static str, v: i64) -> Result<T, StorageError> {
    T::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn map_annotation_row(row: &SqliteRow) -> Result<Annotation, StorageError> {
    let id: AnnotationId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let context_key = ContextKey::new(row.try_get::<String, _>("context_key").map_err(ser)?)
        .map_err(ser)?;
    let color = HighlightColor::from_name(&row.try_get::<String, _>("color").map_err(ser)?);
    let start_offset = from_i64("start_offset", row.try_get::<i64, _>("start_offset").map_err(ser)?)?;
    let end_offset = from_i64("end_offset", row.try_get::<i64, _>("end_offset").map_err(ser)?)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;

    Annotation::from_persisted(
        id,
        context_key,
        row.try_get("text").map_err(ser)?,
        row.try_get("note").map_err(ser)?,
        color,
        start_offset,
        end_offset,
        created_at,
    )
    .map_err(ser)
}

pub(crate) fn answers_to_json(answers: &BTreeMap<u32, usize>) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let exam_id = ExamId::new(from_i64("exam_id", row.try_get::<i64, _>("exam_id").map_err(ser)?)?);
    let kind: ExamKind = row
        .try_get::<String, _>("kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let answers: BTreeMap<u32, usize> =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;

    Ok(AttemptRow {
        id,
        record: AttemptRecord {
            exam_id,
            kind,
            answers,
            correct: from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
            total: from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
            remaining_seconds: from_i64(
                "remaining_seconds",
                row.try_get::<i64, _>("remaining_seconds").map_err(ser)?,
            )?,
            expired: row.try_get::<i64, _>("expired").map_err(ser)? != 0,
            submitted_at: row.try_get("submitted_at").map_err(ser)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_serialize_with_string_keys() {
        let answers = BTreeMap::from([(1_u32, 0_usize), (12, 3)]);
        let json = answers_to_json(&answers).unwrap();
        assert_eq!(json, r#"{"1":0,"12":3}"#);
        let back: BTreeMap<u32, usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answers);
    }

    #[test]
    fn range_checks_reject_negative_values() {
        assert!(from_i64::<usize>("start_offset", -1).is_err());
        assert_eq!(from_i64::<u32>("total", 50).unwrap(), 50);
        assert!(to_i64("exam_id", u64::MAX).is_err());
    }
}
