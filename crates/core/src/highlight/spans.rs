//! Offset-anchored highlighting.
//!
//! Marks are placed by their `[start_offset, end_offset)` character range in
//! the original text, in a single pass. Spans that are empty, out of bounds,
//! stale (the covered text no longer matches) or overlap an earlier span are
//! left out. Plain text between spans is HTML-escaped.

use html_escape::encode_text;
use tracing::trace;

use super::mark::{Mark, MarkId, is_active};
use super::open_tag;
use super::style::style_of;

/// Renders `source` with one marker per valid, non-overlapping span.
#[must_use]
pub fn render_spans(source: &str, marks: &[Mark<'_>], focus: Option<MarkId>) -> String {
    // Byte offset of every char boundary, including the end of the string.
    let boundaries: Vec<usize> = source
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(source.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut spans: Vec<(usize, &Mark<'_>)> = marks
        .iter()
        .enumerate()
        .filter(|(_, mark)| {
            let valid = mark.start_offset < mark.end_offset
                && mark.end_offset <= char_len
                && matches_text(
                    &source[boundaries[mark.start_offset]..boundaries[mark.end_offset]],
                    mark.text,
                );
            if !valid {
                trace!(id = %mark.id, "span dropped");
            }
            valid
        })
        .collect();
    spans.sort_by_key(|(order, mark)| (mark.start_offset, *order));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0_usize;
    for (_, mark) in spans {
        if mark.start_offset < cursor {
            trace!(id = %mark.id, "overlapping span dropped");
            continue;
        }
        out.push_str(&encode_text(
            &source[boundaries[cursor]..boundaries[mark.start_offset]],
        ));

        let style = style_of(mark.color, is_active(focus, mark.id), mark.has_note);
        out.push_str(&open_tag(style.class(), mark.id));
        out.push_str(&encode_text(
            &source[boundaries[mark.start_offset]..boundaries[mark.end_offset]],
        ));
        out.push_str("</mark>");
        cursor = mark.end_offset;
    }
    out.push_str(&encode_text(&source[boundaries[cursor]..]));
    out
}

fn matches_text(covered: &str, expected: &str) -> bool {
    covered == expected || covered.to_lowercase() == expected.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::mark::marks_for;
    use crate::model::{Annotation, AnnotationDraft, ContextKey, HighlightColor};
    use crate::time::fixed_now;

    fn annotation(text: &str, start: usize, end: usize) -> Annotation {
        AnnotationDraft {
            context_key: ContextKey::new("exam:1:p1").unwrap(),
            text: text.to_string(),
            note: None,
            color: HighlightColor::Yellow,
            start_offset: start,
            end_offset: end,
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[test]
    fn only_the_selected_occurrence_is_highlighted() {
        let a = annotation("abc", 4, 7);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_spans("abc abc", &marks, None);

        assert_eq!(out.matches("</mark>").count(), 1);
        assert!(out.starts_with("abc <mark"));
        assert!(out.ends_with(">abc</mark>"));
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        // Highlight "글을" in "다음 글을 읽고".
        let a = annotation("글을", 3, 5);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_spans("다음 글을 읽고", &marks, None);
        assert!(out.starts_with("다음 <mark"));
        assert!(out.contains(">글을</mark> 읽고"));
    }

    #[test]
    fn plain_text_is_escaped() {
        let a = annotation("b", 4, 5);
        let marks = marks_for(std::slice::from_ref(&a), None);
        let out = render_spans("a < b & c", &marks, None);
        assert!(out.starts_with("a &lt; <mark"));
        assert!(out.ends_with("</mark> &amp; c"));
        assert_eq!(render_spans("x<y", &[], None), "x&lt;y");
    }

    #[test]
    fn stale_and_out_of_bounds_spans_are_dropped() {
        let stale = annotation("abc", 0, 3);
        let beyond = annotation("zzz", 10, 13);
        let annotations = vec![stale, beyond];
        let marks = marks_for(&annotations, None);
        assert_eq!(render_spans("xyz", &marks, None), "xyz");
    }

    #[test]
    fn overlapping_spans_keep_the_earlier_start() {
        let first = annotation("hello wo", 0, 8);
        let second = annotation("world", 6, 11);
        let third = annotation("!", 11, 12);
        let annotations = vec![second, first, third];
        let marks = marks_for(&annotations, None);

        let out = render_spans("hello world!", &marks, None);
        assert_eq!(out.matches("</mark>").count(), 2);
        assert!(out.contains(&annotations[1].id().to_string()));
        assert!(!out.contains(&annotations[0].id().to_string()));
        assert!(out.contains(">hello wo</mark>rld<mark"));
    }

    #[test]
    fn identical_ranges_keep_insertion_order() {
        let first = annotation("abc", 0, 3);
        let second = annotation("abc", 0, 3);
        let annotations = vec![first, second];
        let marks = marks_for(&annotations, None);
        let out = render_spans("abc", &marks, None);
        assert!(out.contains(&annotations[0].id().to_string()));
        assert!(!out.contains(&annotations[1].id().to_string()));
    }

    #[test]
    fn case_differences_are_not_stale() {
        let a = annotation("ABC", 0, 3);
        let marks = marks_for(std::slice::from_ref(&a), None);
        assert!(render_spans("abc", &marks, None).contains(">abc</mark>"));
    }
}
