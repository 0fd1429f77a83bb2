//! Substring-based highlighting.
//!
//! Each mark's text is matched case-insensitively against the working copy
//! as rewritten by the marks before it, and every occurrence is wrapped.
//! Consequences kept on purpose:
//! - repeated substrings are all highlighted, not only the selected one;
//! - a later mark can match inside markup emitted for an earlier one.
//!
//! `render_spans` is the offset-anchored replacement.

use regex::{Captures, RegexBuilder};
use tracing::warn;

use super::mark::{Mark, MarkId, is_active};
use super::open_tag;
use super::style::style_of;

/// Rewrites `source`, wrapping every case-insensitive occurrence of each
/// mark's text. The source is treated as markup and is not escaped.
#[must_use]
pub fn render_legacy(source: &str, marks: &[Mark<'_>], focus: Option<MarkId>) -> String {
    if marks.is_empty() {
        return source.to_string();
    }

    let mut working = source.to_string();
    for mark in marks {
        if mark.text.is_empty() {
            continue;
        }
        let pattern = match RegexBuilder::new(&regex::escape(mark.text))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(id = %mark.id, error = %err, "skipping highlight with unbuildable pattern");
                continue;
            }
        };

        let style = style_of(mark.color, is_active(focus, mark.id), mark.has_note);
        let open = open_tag(style.class(), mark.id);
        working = pattern
            .replace_all(&working, |caps: &Captures<'_>| {
                format!("{open}{}</mark>", &caps[0])
            })
            .into_owned();
    }
    working
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::mark::marks_for;
    use crate::model::{Annotation, AnnotationDraft, ContextKey, HighlightColor};
    use crate::time::fixed_now;

    fn annotation(text: &str, color: HighlightColor, note: Option<&str>) -> Annotation {
        AnnotationDraft {
            context_key: ContextKey::new("exam:1:p1").unwrap(),
            text: text.to_string(),
            note: note.map(str::to_string),
            color,
            start_offset: 0,
            end_offset: text.chars().count(),
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[test]
    fn no_marks_returns_source_unchanged() {
        assert_eq!(render_legacy("a < b", &[], None), "a < b");
    }

    #[test]
    fn highlights_every_occurrence_with_same_id_and_style() {
        let a = annotation("abc", HighlightColor::Yellow, None);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_legacy("abc abc", &marks, None);

        let class = style_of(HighlightColor::Yellow, false, false).class();
        let wrapped = format!(
            "<mark class=\"{class}\" data-annotation-id=\"{}\">abc</mark>",
            a.id()
        );
        assert_eq!(out, format!("{wrapped} {wrapped}"));
        assert_eq!(out.matches(&a.id().to_string()).count(), 2);
    }

    #[test]
    fn matching_is_case_insensitive_and_keeps_original_case() {
        let a = annotation("hello", HighlightColor::Blue, None);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_legacy("Hello HELLO", &marks, None);
        assert!(out.contains(">Hello</mark>"));
        assert!(out.contains(">HELLO</mark>"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let a = annotation("(a+b)", HighlightColor::Pink, None);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_legacy("x (a+b) aab", &marks, None);
        assert_eq!(out.matches("</mark>").count(), 1);
        assert!(out.contains(">(a+b)</mark>"));
    }

    #[test]
    fn stale_text_renders_unhighlighted() {
        let a = annotation("gone", HighlightColor::Green, None);
        let marks = marks_for(std::slice::from_ref(&a), None);
        assert_eq!(render_legacy("nothing here", &marks, None), "nothing here");
    }

    #[test]
    fn later_marks_can_match_inside_earlier_markup() {
        let first = annotation("word", HighlightColor::Green, None);
        let second = annotation("green", HighlightColor::Pink, None);
        let annotations = vec![first, second];
        let marks = marks_for(&annotations, None);

        let out = render_legacy("word", &marks, None);
        // "green" only occurs in the class list emitted for the first mark.
        assert!(out.contains(&annotations[1].id().to_string()));
        assert!(out.contains("bg-<mark"));
    }

    #[test]
    fn focus_switches_style_to_solid() {
        let a = annotation("note me", HighlightColor::Yellow, Some("memo"));
        let marks = marks_for(std::slice::from_ref(&a), None);

        let idle = render_legacy("note me", &marks, None);
        assert!(idle.contains(style_of(HighlightColor::Yellow, false, true).class()));

        let focused = render_legacy("note me", &marks, Some(MarkId::Saved(a.id())));
        assert!(focused.contains(style_of(HighlightColor::Yellow, true, true).class()));
    }

    #[test]
    fn pending_selection_is_active_without_focus() {
        let pending = crate::highlight::PendingSelection {
            text: "sel".into(),
            color: HighlightColor::Green,
            start_offset: 0,
            end_offset: 3,
        };
        let marks = marks_for(&[], Some(&pending));
        let out = render_legacy("sel", &marks, None);
        assert!(out.contains("data-annotation-id=\"pending\""));
        assert!(out.contains(style_of(HighlightColor::Green, true, false).class()));
    }
}
