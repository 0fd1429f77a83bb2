use std::collections::HashMap;

use tracing::debug;

use crate::model::{Annotation, AnnotationEdit, AnnotationId, ContextKey};

/// Owns every annotation of a session, grouped by context key.
///
/// Within a context, annotations keep insertion order; the highlight
/// renderers apply them in that order.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    by_context: HashMap<ContextKey, Vec<Annotation>>,
}

impl AnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `annotation` to its context and returns its id. Identical or
    /// overlapping text is allowed.
    pub fn create(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        debug!(id = %id, context = %annotation.context_key(), "annotation created");
        self.by_context
            .entry(annotation.context_key().clone())
            .or_default()
            .push(annotation);
        id
    }

    /// Removes one annotation. Unknown keys or ids are a no-op returning `None`.
    pub fn delete(&mut self, context_key: &ContextKey, id: AnnotationId) -> Option<Annotation> {
        let list = self.by_context.get_mut(context_key)?;
        let pos = list.iter().position(|a| a.id() == id)?;
        let removed = list.remove(pos);
        if list.is_empty() {
            self.by_context.remove(context_key);
        }
        debug!(%id, context = %context_key, "annotation deleted");
        Some(removed)
    }

    /// Annotations for `context_key` in insertion order; empty when none exist.
    #[must_use]
    pub fn list_for_context(&self, context_key: &ContextKey) -> &[Annotation] {
        self.by_context
            .get(context_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, context_key: &ContextKey, id: AnnotationId) -> Option<&Annotation> {
        self.list_for_context(context_key)
            .iter()
            .find(|a| a.id() == id)
    }

    /// Changes the note and/or color of an existing annotation.
    pub fn update(
        &mut self,
        context_key: &ContextKey,
        id: AnnotationId,
        edit: AnnotationEdit,
    ) -> Option<&Annotation> {
        let annotation = self
            .by_context
            .get_mut(context_key)?
            .iter_mut()
            .find(|a| a.id() == id)?;
        annotation.apply_edit(edit);
        Some(&*annotation)
    }

    /// Installs previously persisted annotations for a context, replacing
    /// whatever the store held for it. Entries scoped to another context are skipped.
    pub fn hydrate(&mut self, context_key: &ContextKey, annotations: Vec<Annotation>) {
        let list: Vec<Annotation> = annotations
            .into_iter()
            .filter(|a| a.context_key() == context_key)
            .collect();
        if list.is_empty() {
            self.by_context.remove(context_key);
        } else {
            self.by_context.insert(context_key.clone(), list);
        }
    }

    /// Drops every annotation for a context, returning them.
    pub fn clear_context(&mut self, context_key: &ContextKey) -> Vec<Annotation> {
        self.by_context.remove(context_key).unwrap_or_default()
    }

    /// Total number of annotations across contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_context.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_context.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationDraft, ExamId, HighlightColor};
    use crate::time::fixed_now;

    fn annotation(key: &ContextKey, text: &str) -> Annotation {
        AnnotationDraft {
            context_key: key.clone(),
            text: text.to_string(),
            note: None,
            color: HighlightColor::Yellow,
            start_offset: 0,
            end_offset: text.chars().count(),
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[test]
    fn lists_in_insertion_order_and_allows_duplicates() {
        let key = ContextKey::question(ExamId::new(1), 1);
        let mut store = AnnotationStore::new();
        let created = annotation(&key, "abc");
        let expected = created.id();
        let first = store.create(created);
        assert_eq!(first, expected);
        let second = store.create(annotation(&key, "abc"));
        let third = store.create(annotation(&key, "xyz"));

        let ids: Vec<_> = store.list_for_context(&key).iter().map(Annotation::id).collect();
        assert_eq!(ids, vec![first, second, third]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn contexts_are_isolated() {
        let exam = ExamId::new(1);
        let q1 = ContextKey::question(exam, 1);
        let q2 = ContextKey::question(exam, 2);
        let mut store = AnnotationStore::new();
        store.create(annotation(&q1, "abc"));

        assert_eq!(store.list_for_context(&q1).len(), 1);
        assert!(store.list_for_context(&q2).is_empty());
    }

    #[test]
    fn delete_missing_is_a_noop() {
        let key = ContextKey::question(ExamId::new(1), 1);
        let other = ContextKey::question(ExamId::new(1), 9);
        let mut store = AnnotationStore::new();
        let id = store.create(annotation(&key, "abc"));

        assert!(store.delete(&key, AnnotationId::generate()).is_none());
        assert!(store.delete(&other, id).is_none());
        assert_eq!(store.len(), 1);

        assert_eq!(store.delete(&key, id).map(|a| a.id()), Some(id));
        assert!(store.is_empty());
        assert!(store.delete(&key, id).is_none());
    }

    #[test]
    fn update_changes_note() {
        let key = ContextKey::question(ExamId::new(1), 1);
        let mut store = AnnotationStore::new();
        let id = store.create(annotation(&key, "abc"));

        let updated = store
            .update(
                &key,
                id,
                AnnotationEdit {
                    note: Some(Some("verb ending".into())),
                    color: None,
                },
            )
            .unwrap();
        assert_eq!(updated.note(), Some("verb ending"));
        assert!(store
            .update(&key, AnnotationId::generate(), AnnotationEdit::default())
            .is_none());
    }

    #[test]
    fn hydrate_replaces_context_and_skips_foreign_entries() {
        let exam = ExamId::new(1);
        let key = ContextKey::passage(exam, 19);
        let foreign = ContextKey::passage(exam, 21);
        let mut store = AnnotationStore::new();
        store.create(annotation(&key, "old"));

        store.hydrate(
            &key,
            vec![annotation(&key, "one"), annotation(&foreign, "x"), annotation(&key, "two")],
        );
        let texts: Vec<_> = store.list_for_context(&key).iter().map(Annotation::text).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(store.list_for_context(&foreign).is_empty());

        assert_eq!(store.clear_context(&key).len(), 2);
        assert!(store.is_empty());
    }
}
