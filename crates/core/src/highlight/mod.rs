//! Highlight rendering for annotated passages and questions.

mod legacy;
mod mark;
mod spans;
mod style;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use legacy::render_legacy;
pub use mark::{Mark, MarkId, PendingSelection, is_active, marks_for};
pub use spans::render_spans;
pub use style::{HighlightStyle, StyleVariant, style_of};

/// Which renderer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Substring replacement over the working copy.
    #[default]
    Legacy,
    /// Offset-anchored single pass.
    Spans,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(RenderMode::Legacy),
            "spans" => Ok(RenderMode::Spans),
            other => Err(format!("unknown render mode: {other}")),
        }
    }
}

/// Renders `source` with the given marks using `mode`.
#[must_use]
pub fn render(mode: RenderMode, source: &str, marks: &[Mark<'_>], focus: Option<MarkId>) -> String {
    match mode {
        RenderMode::Legacy => render_legacy(source, marks, focus),
        RenderMode::Spans => render_spans(source, marks, focus),
    }
}

fn open_tag(class: &str, id: MarkId) -> String {
    format!("<mark class=\"{class}\" data-annotation-id=\"{id}\">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HighlightColor;

    #[test]
    fn render_dispatches_by_mode() {
        let pending = PendingSelection {
            text: "b".into(),
            color: HighlightColor::Blue,
            start_offset: 2,
            end_offset: 3,
        };
        let marks = marks_for(&[], Some(&pending));

        // Legacy wraps both occurrences, spans only the anchored one.
        let legacy = render(RenderMode::Legacy, "b b", &marks, None);
        let spans = render(RenderMode::Spans, "b b", &marks, None);
        assert_eq!(legacy.matches("</mark>").count(), 2);
        assert_eq!(spans.matches("</mark>").count(), 1);
        assert!(spans.starts_with("b <mark"));
    }

    #[test]
    fn render_mode_parses() {
        assert_eq!("Spans".parse::<RenderMode>(), Ok(RenderMode::Spans));
        assert_eq!(RenderMode::default(), RenderMode::Legacy);
        assert!("fancy".parse::<RenderMode>().is_err());
    }
}
