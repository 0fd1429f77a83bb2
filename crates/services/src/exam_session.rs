use std::sync::Arc;

use exam_core::highlight::{self, MarkId, PendingSelection, RenderMode, marks_for};
use exam_core::model::{
    Annotation, AnnotationDraft, AnnotationEdit, AnnotationId, ContextKey, ExamDefinition,
    HighlightColor, Question,
};
use exam_core::sections::{QuestionLayout, SectionResolver};
use exam_core::time::format_countdown;
use exam_core::{AnnotationStore, Clock, SessionPhase, SessionSnapshot, SessionState, TickOutcome};
use storage::repository::AttemptRecord;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::persistence::{PersistOp, PersistenceHandle};

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Signals raised by a session. Each variant is sent at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TimeExpired,
    Submitted(AttemptRecord),
}

/// Receiving side of a session's event channel.
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Waits for the next event. Returns `None` once the session is dropped.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Returns an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// All events delivered so far.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One exam attempt.
///
/// Binds the exam paper and its section layout to the answer/timer state,
/// the annotations made while taking it, the question cursor and the
/// selection being composed. Storage writes go through the persistence
/// queue when one is attached.
pub struct ExamSession {
    definition: Arc<ExamDefinition>,
    resolver: SectionResolver,
    state: SessionState,
    annotations: AnnotationStore,
    pending: Option<(ContextKey, PendingSelection)>,
    focus: Option<MarkId>,
    current: u32,
    clock: Clock,
    events: mpsc::UnboundedSender<SessionEvent>,
    phase: watch::Sender<SessionPhase>,
    persistence: Option<PersistenceHandle>,
}

impl ExamSession {
    /// Starts an attempt with the full time limit on the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::KindMismatch` if the section table belongs to
    /// the other paper and `SessionError::SectionMismatch` if it does not
    /// cover exactly the exam's questions.
    pub fn start(
        definition: Arc<ExamDefinition>,
        resolver: SectionResolver,
        clock: Clock,
    ) -> Result<(Self, SessionEvents), SessionError> {
        let table_kind = resolver.table().kind();
        if table_kind != definition.kind() {
            return Err(SessionError::KindMismatch {
                exam: definition.kind(),
                table: table_kind,
            });
        }
        if resolver.question_count() != definition.question_count() {
            return Err(SessionError::SectionMismatch {
                exam: definition.question_count(),
                table: resolver.question_count(),
            });
        }

        info!(
            exam_id = %definition.id(),
            kind = %definition.kind(),
            minutes = definition.time_limit_minutes(),
            "exam session started"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let state = SessionState::new(definition.time_limit_minutes());
        let (phase, _) = watch::channel(state.phase());
        let session = Self {
            state,
            definition,
            resolver,
            annotations: AnnotationStore::new(),
            pending: None,
            focus: None,
            current: 1,
            clock,
            events: tx,
            phase,
            persistence: None,
        };
        Ok((session, SessionEvents { rx }))
    }

    /// Routes annotation and attempt writes to `handle`.
    #[must_use]
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.persistence = Some(handle);
        self
    }

    #[must_use]
    pub fn definition(&self) -> &ExamDefinition {
        &self.definition
    }

    #[must_use]
    pub fn resolver(&self) -> &SectionResolver {
        &self.resolver
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    // ─── QUESTIONS ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn current_question(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn question(&self, number: u32) -> Option<&Question> {
        self.definition.question(number)
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.question(self.current)
    }

    #[must_use]
    pub fn layout(&self, number: u32) -> QuestionLayout {
        self.resolver.layout(number)
    }

    #[must_use]
    pub fn current_layout(&self) -> QuestionLayout {
        self.layout(self.current)
    }

    /// Instruction to show above `number`, only for the first question of
    /// its section.
    #[must_use]
    pub fn instruction(&self, number: u32) -> Option<&str> {
        if !self.resolver.should_show_instruction(number) {
            return None;
        }
        self.resolver
            .resolve_section(number)
            .map(|section| section.instruction.as_str())
    }

    /// Moves the cursor. Returns `false` and stays put when out of range.
    pub fn go_to(&mut self, number: u32) -> bool {
        if !(1..=self.definition.question_count()).contains(&number) {
            return false;
        }
        self.current = number;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(number) => self.go_to(number),
            None => false,
        }
    }

    // ─── ANSWERS & CLOCK ───────────────────────────────────────────────────

    /// Records an answer. `Ok(false)` means the attempt no longer accepts answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` or `SessionError::InvalidOption`
    /// if the choice does not exist in the paper.
    pub fn set_answer(&mut self, number: u32, option: usize) -> Result<bool, SessionError> {
        let question = self
            .definition
            .question(number)
            .ok_or(SessionError::UnknownQuestion(number))?;
        if option >= question.options.len() {
            return Err(SessionError::InvalidOption { number, option });
        }
        Ok(self.state.set_answer(number, option))
    }

    /// Records an answer for the question under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` if the option does not exist.
    pub fn answer_current(&mut self, option: usize) -> Result<bool, SessionError> {
        self.set_answer(self.current, option)
    }

    #[must_use]
    pub fn answer(&self, number: u32) -> Option<usize> {
        self.state.answer(number)
    }

    /// Question numbers without an answer, ascending.
    #[must_use]
    pub fn unanswered(&self) -> Vec<u32> {
        (1..=self.definition.question_count())
            .filter(|number| self.state.answer(*number).is_none())
            .collect()
    }

    /// Number of answers matching the answer key.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.definition.count_correct(self.state.answers())
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Follows phase changes, starting from the current phase.
    #[must_use]
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds()
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.state.remaining_seconds())
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state.is_submitted()
    }

    /// Advances the clock by one second, signalling expiry the first time
    /// it reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.state.tick();
        if outcome == TickOutcome::Expired {
            info!(exam_id = %self.definition.id(), "exam time expired");
            self.emit(SessionEvent::TimeExpired);
            self.publish_phase();
        }
        outcome
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.state.pause();
        self.publish_phase();
        paused
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.state.resume();
        self.publish_phase();
        resumed
    }

    /// Submits the attempt, queues it for storage and signals `Submitted`.
    ///
    /// Returns `None` if the attempt was already submitted.
    pub fn submit(&mut self) -> Option<AttemptRecord> {
        let snapshot = self.state.submit()?;
        self.publish_phase();
        let record = self.attempt_record(snapshot);
        info!(
            exam_id = %record.exam_id,
            correct = record.correct,
            total = record.total,
            expired = record.expired,
            "exam submitted"
        );
        self.enqueue(PersistOp::SaveAttempt(record.clone()));
        self.emit(SessionEvent::Submitted(record.clone()));
        Some(record)
    }

    fn attempt_record(&self, snapshot: SessionSnapshot) -> AttemptRecord {
        AttemptRecord {
            exam_id: self.definition.id(),
            kind: self.definition.kind(),
            correct: self.definition.count_correct(&snapshot.answers),
            total: self.definition.question_count(),
            answers: snapshot.answers,
            remaining_seconds: snapshot.remaining_seconds,
            expired: snapshot.expired,
            submitted_at: self.clock.now(),
        }
    }

    // ─── ANNOTATIONS ───────────────────────────────────────────────────────

    /// Starts composing a highlight; it renders as the active mark until it
    /// is saved or cancelled. Replaces any earlier unsaved selection.
    pub fn begin_selection(
        &mut self,
        context_key: ContextKey,
        text: impl Into<String>,
        start_offset: usize,
        end_offset: usize,
        color: HighlightColor,
    ) {
        let selection = PendingSelection {
            text: text.into(),
            color,
            start_offset,
            end_offset,
        };
        self.pending = Some((context_key, selection));
        self.focus = None;
    }

    /// Changes the color of the selection being composed.
    pub fn set_selection_color(&mut self, color: HighlightColor) -> bool {
        match &mut self.pending {
            Some((_, selection)) => {
                selection.color = color;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn pending_selection(&self) -> Option<(&ContextKey, &PendingSelection)> {
        self.pending.as_ref().map(|(key, selection)| (key, selection))
    }

    pub fn cancel_selection(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Turns the pending selection into a saved annotation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSelection` without a pending selection and
    /// `SessionError::Annotation` if it is invalid; the selection is kept in
    /// that case.
    pub fn save_selection(&mut self, note: Option<String>) -> Result<AnnotationId, SessionError> {
        let (context_key, selection) = self.pending.as_ref().ok_or(SessionError::NoSelection)?;
        let draft = AnnotationDraft {
            context_key: context_key.clone(),
            text: selection.text.clone(),
            note,
            color: selection.color,
            start_offset: selection.start_offset,
            end_offset: selection.end_offset,
        };
        let id = self.create_annotation(draft)?;
        self.pending = None;
        Ok(id)
    }

    /// Saves a new annotation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Annotation` if the draft is empty or its range is invalid.
    pub fn create_annotation(&mut self, draft: AnnotationDraft) -> Result<AnnotationId, SessionError> {
        let annotation = draft.validate(self.clock.now())?;
        self.enqueue(PersistOp::SaveAnnotation(annotation.clone()));
        Ok(self.annotations.create(annotation))
    }

    /// Deletes an annotation. Missing ids are a no-op returning `false`.
    pub fn delete_annotation(&mut self, context_key: &ContextKey, id: AnnotationId) -> bool {
        if self.annotations.delete(context_key, id).is_none() {
            return false;
        }
        if self.focus == Some(MarkId::Saved(id)) {
            self.focus = None;
        }
        self.enqueue(PersistOp::DeleteAnnotation {
            context_key: context_key.clone(),
            id,
        });
        true
    }

    /// Changes the note and/or color of an annotation.
    pub fn update_annotation(
        &mut self,
        context_key: &ContextKey,
        id: AnnotationId,
        edit: AnnotationEdit,
    ) -> bool {
        let Some(updated) = self.annotations.update(context_key, id, edit).cloned() else {
            return false;
        };
        self.enqueue(PersistOp::SaveAnnotation(updated));
        true
    }

    /// Sets which mark is emphasized. `None` gives the emphasis to the
    /// pending selection.
    pub fn focus(&mut self, target: Option<MarkId>) {
        self.focus = target;
    }

    #[must_use]
    pub fn focused(&self) -> Option<MarkId> {
        self.focus
    }

    #[must_use]
    pub fn annotations(&self, context_key: &ContextKey) -> &[Annotation] {
        self.annotations.list_for_context(context_key)
    }

    #[must_use]
    pub fn annotation_store(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Loads previously persisted annotations for a context.
    pub fn hydrate_annotations(&mut self, context_key: &ContextKey, annotations: Vec<Annotation>) {
        self.annotations.hydrate(context_key, annotations);
    }

    /// Renders `source` with the context's annotations and, when it belongs
    /// to this context, the pending selection.
    #[must_use]
    pub fn render(&self, context_key: &ContextKey, source: &str, mode: RenderMode) -> String {
        let pending = self
            .pending
            .as_ref()
            .filter(|(key, _)| key == context_key)
            .map(|(_, selection)| selection);
        let marks = marks_for(self.annotations.list_for_context(context_key), pending);
        highlight::render(mode, source, &marks, self.focus)
    }

    // ─── PLUMBING ──────────────────────────────────────────────────────────

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("session event dropped; no listener");
        }
    }

    fn publish_phase(&self) {
        let current = self.state.phase();
        self.phase.send_if_modified(|seen| {
            let changed = *seen != current;
            *seen = current;
            changed
        });
    }

    fn enqueue(&self, op: PersistOp) {
        if let Some(handle) = &self.persistence {
            handle.enqueue(op);
        }
    }
}
