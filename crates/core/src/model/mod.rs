mod annotation;
mod exam;
mod ids;
mod section;

pub use ids::{AnnotationId, ContextKey, ExamId, ParseIdError};

pub use annotation::{Annotation, AnnotationDraft, AnnotationEdit, AnnotationError, HighlightColor};
pub use exam::{ExamDefinition, ExamError, ExamKind, Question};
pub use section::{QuestionRange, Section, SectionTable, SectionTableError};
