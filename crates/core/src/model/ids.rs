use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an exam paper
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExamId(u64);

impl ExamId {
    /// Creates a new `ExamId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for an annotation.
///
/// Freshly created annotations get a random v4 id; persisted ones keep theirs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    /// Generates a new random `AnnotationId`
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Scope under which annotations are stored and matched: one rendered
/// passage or question.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextKey(String);

impl ContextKey {
    /// Wraps an arbitrary key.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdError` if the key is blank.
    pub fn new(key: impl Into<String>) -> Result<Self, ParseIdError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ParseIdError {
                kind: "ContextKey".to_string(),
            });
        }
        Ok(Self(key))
    }

    /// Key for the text of a single question.
    #[must_use]
    pub fn question(exam_id: ExamId, number: u32) -> Self {
        Self(format!("exam:{exam_id}:q{number}"))
    }

    /// Key for the passage shown with a question (or its group).
    #[must_use]
    pub fn passage(exam_id: ExamId, number: u32) -> Self {
        Self(format!("exam:{exam_id}:p{number}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContextKey {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContextKey> for String {
    fn from(value: ContextKey) -> Self {
        value.0
    }
}

impl fmt::Debug for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExamId({})", self.0)
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ExamId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(ExamId::new)
            .map_err(|_| ParseIdError {
                kind: "ExamId".to_string(),
            })
    }
}

impl FromStr for AnnotationId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(AnnotationId)
            .map_err(|_| ParseIdError {
                kind: "AnnotationId".to_string(),
            })
    }
}

impl FromStr for ContextKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_id_display() {
        let id = ExamId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_exam_id_from_str_invalid() {
        let result = "not-a-number".parse::<ExamId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_annotation_id_roundtrip() {
        let original = AnnotationId::generate();
        let parsed: AnnotationId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_generated_annotation_ids_differ() {
        assert_ne!(AnnotationId::generate(), AnnotationId::generate());
    }

    #[test]
    fn test_context_key_helpers() {
        let exam = ExamId::new(7);
        assert_eq!(ContextKey::question(exam, 19).as_str(), "exam:7:q19");
        assert_eq!(ContextKey::passage(exam, 19).as_str(), "exam:7:p19");
        assert_ne!(ContextKey::question(exam, 1), ContextKey::passage(exam, 1));
    }

    #[test]
    fn test_context_key_rejects_blank() {
        assert!(ContextKey::new("   ").is_err());
        assert!("".parse::<ContextKey>().is_err());
    }
}
