use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::exam::ExamKind;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionTableError {
    #[error("section table for {kind} has no sections")]
    Empty { kind: ExamKind },

    #[error("section [{start}, {end}] is not a valid 1-based range")]
    InvalidRange { start: u32, end: u32 },

    #[error("first section must start at question 1 (starts at {start})")]
    DoesNotStartAtOne { start: u32 },

    #[error("gap between question {after} and question {next}")]
    Gap { after: u32, next: u32 },

    #[error("section starting at {start} overlaps the previous section ending at {previous_end}")]
    Overlap { start: u32, previous_end: u32 },
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// Inclusive 1-based question range, written `[start, end]` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct QuestionRange {
    pub start: u32,
    pub end: u32,
}

impl QuestionRange {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

impl From<[u32; 2]> for QuestionRange {
    fn from([start, end]: [u32; 2]) -> Self {
        Self { start, end }
    }
}

impl From<QuestionRange> for [u32; 2] {
    fn from(range: QuestionRange) -> Self {
        [range.start, range.end]
    }
}

/// A contiguous run of questions sharing one instruction and grouping behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub range: QuestionRange,
    pub instruction: String,
    #[serde(default)]
    pub grouped: bool,
}

impl Section {
    #[must_use]
    pub fn new(start: u32, end: u32, instruction: impl Into<String>, grouped: bool) -> Self {
        Self {
            range: QuestionRange::new(start, end),
            instruction: instruction.into(),
            grouped,
        }
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.range.start
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.range.end
    }
}

/// Ordered, gap-free partition of `1..=N` into sections for one exam kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTable {
    kind: ExamKind,
    sections: Vec<Section>,
}

impl SectionTable {
    /// Builds a table, checking the partition invariant.
    ///
    /// # Errors
    ///
    /// Returns `SectionTableError` if the sections are empty, unsorted,
    /// overlapping, gapped, or do not start at question 1.
    pub fn new(kind: ExamKind, sections: Vec<Section>) -> Result<Self, SectionTableError> {
        let Some(first) = sections.first() else {
            return Err(SectionTableError::Empty { kind });
        };
        if first.start() != 1 {
            return Err(SectionTableError::DoesNotStartAtOne {
                start: first.start(),
            });
        }

        let mut previous_end = 0_u32;
        for section in &sections {
            let (start, end) = (section.start(), section.end());
            if start == 0 || end < start {
                return Err(SectionTableError::InvalidRange { start, end });
            }
            if start <= previous_end {
                return Err(SectionTableError::Overlap {
                    start,
                    previous_end,
                });
            }
            if start != previous_end + 1 {
                return Err(SectionTableError::Gap {
                    after: previous_end,
                    next: start,
                });
            }
            previous_end = end;
        }

        Ok(Self { kind, sections })
    }

    #[must_use]
    pub fn kind(&self) -> ExamKind {
        self.kind
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Highest question number covered by the table.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.sections.last().map_or(0, Section::end)
    }
}
