use std::fmt;

use crate::model::{Annotation, AnnotationId, HighlightColor};

/// Identity of a rendered highlight: a saved annotation or the selection
/// the user is still composing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkId {
    Saved(AnnotationId),
    Pending,
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkId::Saved(id) => write!(f, "{id}"),
            MarkId::Pending => f.write_str("pending"),
        }
    }
}

impl From<AnnotationId> for MarkId {
    fn from(id: AnnotationId) -> Self {
        MarkId::Saved(id)
    }
}

/// Whether a mark is emphasized under the current focus.
///
/// With no focus, the pending selection is the active one.
#[must_use]
pub fn is_active(focus: Option<MarkId>, id: MarkId) -> bool {
    match focus {
        Some(focused) => focused == id,
        None => id == MarkId::Pending,
    }
}

/// Renderer input: what to highlight and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark<'a> {
    pub id: MarkId,
    pub text: &'a str,
    pub color: HighlightColor,
    pub has_note: bool,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl<'a> From<&'a Annotation> for Mark<'a> {
    fn from(annotation: &'a Annotation) -> Self {
        Self {
            id: MarkId::Saved(annotation.id()),
            text: annotation.text(),
            color: annotation.color(),
            has_note: annotation.has_note(),
            start_offset: annotation.start_offset(),
            end_offset: annotation.end_offset(),
        }
    }
}

/// An unsaved selection shown while the user picks a color or writes a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub text: String,
    pub color: HighlightColor,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl PendingSelection {
    #[must_use]
    pub fn as_mark(&self) -> Mark<'_> {
        Mark {
            id: MarkId::Pending,
            text: &self.text,
            color: self.color,
            has_note: false,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
        }
    }
}

/// Stored annotations in order, followed by the pending selection if any.
#[must_use]
pub fn marks_for<'a>(
    annotations: &'a [Annotation],
    pending: Option<&'a PendingSelection>,
) -> Vec<Mark<'a>> {
    annotations
        .iter()
        .map(Mark::from)
        .chain(pending.map(PendingSelection::as_mark))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_rules() {
        let id = MarkId::Saved(AnnotationId::generate());
        let other = MarkId::Saved(AnnotationId::generate());

        assert!(is_active(Some(id), id));
        assert!(!is_active(Some(other), id));
        assert!(!is_active(None, id));
        assert!(is_active(None, MarkId::Pending));
        assert!(!is_active(Some(id), MarkId::Pending));
    }

    #[test]
    fn pending_mark_comes_last() {
        let pending = PendingSelection {
            text: "sel".into(),
            color: HighlightColor::Pink,
            start_offset: 0,
            end_offset: 3,
        };
        let marks = marks_for(&[], Some(&pending));
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].id, MarkId::Pending);
        assert_eq!(marks[0].id.to_string(), "pending");
    }
}
