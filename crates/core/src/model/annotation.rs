use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{AnnotationId, ContextKey};

//
// ─── COLORS ────────────────────────────────────────────────────────────────────
//

/// Highlight palette. Unrecognized names parse to `Yellow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Pink,
    Blue,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 4] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Pink,
        HighlightColor::Blue,
    ];

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "green" => HighlightColor::Green,
            "pink" => HighlightColor::Pink,
            "blue" => HighlightColor::Blue,
            _ => HighlightColor::Yellow,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Pink => "pink",
            HighlightColor::Blue => "blue",
        }
    }
}

impl From<String> for HighlightColor {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<HighlightColor> for String {
    fn from(value: HighlightColor) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnnotationError {
    #[error("annotation text cannot be empty")]
    EmptyText,

    #[error("annotation range [{start}, {end}) is empty or inverted")]
    InvalidRange { start: usize, end: usize },
}

//
// ─── ANNOTATIONS ───────────────────────────────────────────────────────────────
//

/// A user selection that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDraft {
    pub context_key: ContextKey,
    pub text: String,
    pub note: Option<String>,
    pub color: HighlightColor,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl AnnotationDraft {
    /// Validates the selection and assigns a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError::EmptyText` for blank selections and
    /// `AnnotationError::InvalidRange` when `start_offset >= end_offset`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Annotation, AnnotationError> {
        Annotation::from_persisted(
            AnnotationId::generate(),
            self.context_key,
            self.text,
            self.note,
            self.color,
            self.start_offset,
            self.end_offset,
            now,
        )
    }
}

/// A saved highlight, optionally carrying a note.
///
/// Offsets are half-open character offsets into the original source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    context_key: ContextKey,
    text: String,
    note: Option<String>,
    color: HighlightColor,
    start_offset: usize,
    end_offset: usize,
    created_at: DateTime<Utc>,
}

impl Annotation {
    /// Rehydrate an annotation from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError` if text is blank or the range is inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AnnotationId,
        context_key: ContextKey,
        text: String,
        note: Option<String>,
        color: HighlightColor,
        start_offset: usize,
        end_offset: usize,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AnnotationError> {
        if text.trim().is_empty() {
            return Err(AnnotationError::EmptyText);
        }
        if start_offset >= end_offset {
            return Err(AnnotationError::InvalidRange {
                start: start_offset,
                end: end_offset,
            });
        }

        Ok(Self {
            id,
            context_key,
            text,
            note: normalize_note(note),
            color,
            start_offset,
            end_offset,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    #[must_use]
    pub fn context_key(&self) -> &ContextKey {
        &self.context_key
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    #[must_use]
    pub fn has_note(&self) -> bool {
        self.note.is_some()
    }

    #[must_use]
    pub fn color(&self) -> HighlightColor {
        self.color
    }

    #[must_use]
    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Applies an edit; `None` fields are left untouched.
    pub fn apply_edit(&mut self, edit: AnnotationEdit) {
        if let Some(note) = edit.note {
            self.note = normalize_note(note);
        }
        if let Some(color) = edit.color {
            self.color = color;
        }
    }
}

/// Partial update for an existing annotation.
///
/// `note: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationEdit {
    pub note: Option<Option<String>>,
    pub color: Option<HighlightColor>,
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.filter(|n| !n.trim().is_empty())
}
