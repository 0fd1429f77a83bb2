//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use exam_core::model::{AnnotationError, ExamKind};
use exam_core::sections::CatalogError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ExamSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("section table is for {table} but the exam is {exam}")]
    KindMismatch { exam: ExamKind, table: ExamKind },
    #[error("section table covers {table} questions but the exam has {exam}")]
    SectionMismatch { exam: u32, table: u32 },
    #[error("question {0} does not exist")]
    UnknownQuestion(u32),
    #[error("question {number} has no option {option}")]
    InvalidOption { number: u32, option: usize },
    #[error("no selection in progress")]
    NoSelection,
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error("{var} must be a boolean, got {raw:?}")]
    InvalidBool { var: &'static str, raw: String },
    #[error("{0}")]
    InvalidRenderMode(String),
    #[error("failed to read section table {path}: {source}")]
    ReadSections {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors emitted while bootstrapping or running exam services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
