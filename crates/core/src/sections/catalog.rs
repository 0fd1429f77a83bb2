//! Declarative section tables.
//!
//! Built-in tables are embedded at compile time with `include_str!()`; hosts
//! may supply their own TOML text instead (see `SectionCatalog::from_sources`).

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{ExamKind, Section, SectionTable, SectionTableError};

use super::resolver::SectionResolver;

/// Built-in reading table.
pub const READING_SECTIONS: &str = include_str!("../../data/sections/reading.toml");

/// Built-in listening table.
pub const LISTENING_SECTIONS: &str = include_str!("../../data/sections/listening.toml");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid section table TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Table(#[from] SectionTableError),

    #[error("expected a {expected} table, found {found}")]
    KindMismatch { expected: ExamKind, found: ExamKind },
}

#[derive(Debug, Deserialize)]
struct TableFile {
    kind: ExamKind,
    sections: Vec<Section>,
}

/// Parses and validates one section table.
///
/// # Errors
///
/// Returns `CatalogError` if the TOML is malformed or the sections break the
/// partition invariant.
pub fn parse_table(source: &str) -> Result<SectionTable, CatalogError> {
    let file: TableFile = toml::from_str(source)?;
    Ok(SectionTable::new(file.kind, file.sections)?)
}

/// One immutable section table per exam kind.
#[derive(Debug, Clone)]
pub struct SectionCatalog {
    reading: Arc<SectionTable>,
    listening: Arc<SectionTable>,
}

impl SectionCatalog {
    /// Loads the tables embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if an embedded table is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_sources(READING_SECTIONS, LISTENING_SECTIONS)
    }

    /// Loads tables from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if either table is invalid or declares the wrong kind.
    pub fn from_sources(reading: &str, listening: &str) -> Result<Self, CatalogError> {
        Self::from_tables(parse_table(reading)?, parse_table(listening)?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::KindMismatch` if a table is passed in the wrong slot.
    pub fn from_tables(reading: SectionTable, listening: SectionTable) -> Result<Self, CatalogError> {
        for (expected, table) in [(ExamKind::Reading, &reading), (ExamKind::Listening, &listening)] {
            if table.kind() != expected {
                return Err(CatalogError::KindMismatch {
                    expected,
                    found: table.kind(),
                });
            }
        }
        Ok(Self {
            reading: Arc::new(reading),
            listening: Arc::new(listening),
        })
    }

    #[must_use]
    pub fn table(&self, kind: ExamKind) -> &Arc<SectionTable> {
        match kind {
            ExamKind::Reading => &self.reading,
            ExamKind::Listening => &self.listening,
        }
    }

    #[must_use]
    pub fn resolver(&self, kind: ExamKind) -> SectionResolver {
        SectionResolver::new(Arc::clone(self.table(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_valid_and_cover_fifty_questions() {
        let catalog = SectionCatalog::builtin().unwrap();
        for kind in ExamKind::ALL {
            let table = catalog.table(kind);
            assert_eq!(table.kind(), kind);
            assert_eq!(table.question_count(), 50);
        }
    }

    #[test]
    fn rejects_swapped_tables() {
        let err = SectionCatalog::from_sources(LISTENING_SECTIONS, READING_SECTIONS).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::KindMismatch {
                expected: ExamKind::Reading,
                found: ExamKind::Listening
            }
        ));
    }

    #[test]
    fn reports_partition_errors_from_config() {
        let source = r#"
            kind = "reading"

            [[sections]]
            range = [1, 3]
            instruction = "a"

            [[sections]]
            range = [5, 6]
            instruction = "b"
            grouped = true
        "#;
        let err = parse_table(source).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Table(SectionTableError::Gap { after: 3, next: 5 })
        ));
    }

    #[test]
    fn grouped_defaults_to_false() {
        let source = r#"
            kind = "listening"

            [[sections]]
            range = [1, 1]
            instruction = "only"
        "#;
        let table = parse_table(source).unwrap();
        assert!(!table.sections()[0].grouped);
    }

    #[test]
    fn reports_malformed_toml() {
        assert!(matches!(
            parse_table("kind = "),
            Err(CatalogError::Parse(_))
        ));
    }
}
