use crate::model::HighlightColor;

/// Visual treatment of a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleVariant {
    /// Inactive highlight that carries a note.
    Underline,
    /// Focused highlight.
    Solid,
    /// Plain inactive highlight.
    Tint,
}

/// Derived style for one rendered highlight. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightStyle {
    pub color: HighlightColor,
    pub variant: StyleVariant,
}

impl HighlightStyle {
    /// CSS classes for the marker element.
    #[must_use]
    pub fn class(&self) -> &'static str {
        use HighlightColor::{Blue, Green, Pink, Yellow};
        use StyleVariant::{Solid, Tint, Underline};

        match (self.color, self.variant) {
            (Yellow, Underline) => "hl hl-underline border-b-2 border-yellow-500 bg-yellow-50",
            (Green, Underline) => "hl hl-underline border-b-2 border-green-500 bg-green-50",
            (Pink, Underline) => "hl hl-underline border-b-2 border-pink-500 bg-pink-50",
            (Blue, Underline) => "hl hl-underline border-b-2 border-blue-500 bg-blue-50",
            (Yellow, Solid) => "hl hl-active bg-yellow-300 ring-1 ring-yellow-500",
            (Green, Solid) => "hl hl-active bg-green-300 ring-1 ring-green-500",
            (Pink, Solid) => "hl hl-active bg-pink-300 ring-1 ring-pink-500",
            (Blue, Solid) => "hl hl-active bg-blue-300 ring-1 ring-blue-500",
            (Yellow, Tint) => "hl bg-yellow-100",
            (Green, Tint) => "hl bg-green-100",
            (Pink, Tint) => "hl bg-pink-100",
            (Blue, Tint) => "hl bg-blue-100",
        }
    }
}

/// Resolves the style of a highlight.
///
/// Focus wins over note presence: an active highlight is always solid.
#[must_use]
pub fn style_of(color: HighlightColor, is_active: bool, has_note: bool) -> HighlightStyle {
    let variant = if has_note && !is_active {
        StyleVariant::Underline
    } else if is_active {
        StyleVariant::Solid
    } else {
        StyleVariant::Tint
    };
    HighlightStyle { color, variant }
}
