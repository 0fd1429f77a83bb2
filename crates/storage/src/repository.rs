use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{Annotation, AnnotationId, ContextKey, ExamId, ExamKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a submitted attempt.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type AttemptId = i64;

/// Persisted outcome of one submitted exam attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub exam_id: ExamId,
    pub kind: ExamKind,
    pub answers: BTreeMap<u32, usize>,
    pub correct: u32,
    pub total: u32,
    pub remaining_seconds: u32,
    pub expired: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Stored attempt with its assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub record: AttemptRecord,
}

/// Repository contract for annotations.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    /// Insert a new annotation or update the note/color of an existing one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the annotation cannot be stored.
    async fn save_annotation(&self, annotation: &Annotation) -> Result<(), StorageError>;

    /// Remove an annotation. Missing ids are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_annotation(
        &self,
        context_key: &ContextKey,
        id: AnnotationId,
    ) -> Result<(), StorageError>;

    /// Annotations for a context in the order they were first saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or undecodable rows.
    async fn annotations_for_context(
        &self,
        context_key: &ContextKey,
    ) -> Result<Vec<Annotation>, StorageError>;
}

/// Repository contract for submitted attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a submitted attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError>;

    /// Attempts for an exam, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or undecodable rows.
    async fn attempts_for_exam(&self, exam_id: ExamId) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    annotations: Arc<Mutex<Vec<Annotation>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            annotations: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AnnotationRepository for InMemoryRepository {
    async fn save_annotation(&self, annotation: &Annotation) -> Result<(), StorageError> {
        let mut guard = self
            .annotations
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.iter_mut().find(|a| a.id() == annotation.id()) {
            Some(existing) => *existing = annotation.clone(),
            None => guard.push(annotation.clone()),
        }
        Ok(())
    }

    async fn delete_annotation(
        &self,
        context_key: &ContextKey,
        id: AnnotationId,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .annotations
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.retain(|a| !(a.id() == id && a.context_key() == context_key));
        Ok(())
    }

    async fn annotations_for_context(
        &self,
        context_key: &ContextKey,
    ) -> Result<Vec<Annotation>, StorageError> {
        let guard = self
            .annotations
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|a| a.context_key() == context_key)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptId::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?;
        guard.push(AttemptRow {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn attempts_for_exam(&self, exam_id: ExamId) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|row| row.record.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub annotations: Arc<dyn AnnotationRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let annotations: Arc<dyn AnnotationRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            annotations,
            attempts,
        }
    }
}
