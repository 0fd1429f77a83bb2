use thiserror::Error;

use crate::model::{AnnotationError, ExamError, SectionTableError};
use crate::sections::CatalogError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    SectionTable(#[from] SectionTableError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamKind, SectionTable};

    fn load(kind: ExamKind) -> Result<SectionTable, Error> {
        Ok(SectionTable::new(kind, Vec::new())?)
    }

    #[test]
    fn domain_errors_convert() {
        let err = load(ExamKind::Listening).unwrap_err();
        assert!(matches!(err, Error::SectionTable(SectionTableError::Empty { .. })));
        assert!(!err.to_string().is_empty());

        let err: Error = "essay".parse::<ExamKind>().unwrap_err().into();
        assert!(matches!(err, Error::Exam(ExamError::UnknownKind(_))));
    }
}
