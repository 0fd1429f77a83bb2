use std::sync::Arc;

use crate::model::{Section, SectionTable};

/// Layout decisions for rendering one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuestionLayout {
    /// Show the section's instruction bar above this question.
    pub show_instruction: bool,
    /// Question shares its passage with siblings.
    pub grouped: bool,
    /// First question of a grouped section.
    pub first_in_group: bool,
    /// Render the passage; grouped followers reuse the one shown above them.
    pub show_passage: bool,
    /// Number the question inline under the shared passage.
    pub inline_number: bool,
}

/// Maps question numbers to their owning section.
///
/// All queries are pure over the injected table; out-of-range indices yield
/// `None` or `false`.
#[derive(Debug, Clone)]
pub struct SectionResolver {
    table: Arc<SectionTable>,
}

impl SectionResolver {
    #[must_use]
    pub fn new(table: Arc<SectionTable>) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &SectionTable {
        &self.table
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.table.question_count()
    }

    /// Finds the section whose range contains `index`.
    #[must_use]
    pub fn resolve_section(&self, index: u32) -> Option<&Section> {
        let sections = self.table.sections();
        // First section whose end is >= index; ranges are sorted and disjoint.
        let pos = sections.partition_point(|s| s.end() < index);
        sections.get(pos).filter(|s| s.range.contains(index))
    }

    #[must_use]
    pub fn should_show_instruction(&self, index: u32) -> bool {
        self.resolve_section(index)
            .is_some_and(|s| s.start() == index)
    }

    #[must_use]
    pub fn is_grouped_question(&self, index: u32) -> bool {
        self.resolve_section(index).is_some_and(|s| s.grouped)
    }

    #[must_use]
    pub fn is_first_in_group(&self, index: u32) -> bool {
        self.resolve_section(index)
            .is_some_and(|s| s.grouped && s.start() == index)
    }

    /// All layout flags for `index`; the default (all false) when unresolved.
    #[must_use]
    pub fn layout(&self, index: u32) -> QuestionLayout {
        let Some(section) = self.resolve_section(index) else {
            return QuestionLayout::default();
        };
        let is_start = section.start() == index;
        let first_in_group = section.grouped && is_start;
        QuestionLayout {
            show_instruction: is_start,
            grouped: section.grouped,
            first_in_group,
            show_passage: !section.grouped || first_in_group,
            inline_number: section.grouped,
        }
    }
}
