//! Fire-and-forget persistence of annotations and attempts.
//!
//! Writes are queued on an unbounded channel and applied in order by a
//! single worker task. Failures are logged and dropped; nothing is retried.

use exam_core::model::{Annotation, AnnotationId, ContextKey};
use storage::repository::{AttemptRecord, Storage, StorageError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A single storage write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOp {
    SaveAnnotation(Annotation),
    DeleteAnnotation {
        context_key: ContextKey,
        id: AnnotationId,
    },
    SaveAttempt(AttemptRecord),
}

impl PersistOp {
    fn label(&self) -> &'static str {
        match self {
            PersistOp::SaveAnnotation(_) => "save_annotation",
            PersistOp::DeleteAnnotation { .. } => "delete_annotation",
            PersistOp::SaveAttempt(_) => "save_attempt",
        }
    }
}

#[derive(Debug)]
enum Command {
    Apply(PersistOp),
    Shutdown,
}

/// Cloneable sender side of a `PersistenceQueue`.
#[derive(Clone, Debug)]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl PersistenceHandle {
    /// Queues `op` without waiting. Returns `false` once the worker has shut down.
    pub fn enqueue(&self, op: PersistOp) -> bool {
        let label = op.label();
        if self.tx.send(Command::Apply(op)).is_err() {
            warn!(op = label, "persistence queue closed; write dropped");
            return false;
        }
        true
    }
}

/// Owner of the persistence worker task.
pub struct PersistenceQueue {
    handle: PersistenceHandle,
    worker: JoinHandle<()>,
}

impl PersistenceQueue {
    /// Spawns the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(storage: Storage) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(storage, rx));
        Self {
            handle: PersistenceHandle { tx },
            worker,
        }
    }

    #[must_use]
    pub fn handle(&self) -> PersistenceHandle {
        self.handle.clone()
    }

    /// Queues `op` without waiting.
    pub fn enqueue(&self, op: PersistOp) -> bool {
        self.handle.enqueue(op)
    }

    /// Applies everything queued so far, then stops the worker.
    ///
    /// Ops enqueued through outstanding handles afterwards are dropped.
    pub async fn shutdown(self) {
        if self.handle.tx.send(Command::Shutdown).is_err() {
            debug!("persistence worker already stopped");
        }
        if let Err(err) = self.worker.await {
            warn!(error = %err, "persistence worker ended abnormally");
        }
    }
}

async fn run_worker(storage: Storage, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        let op = match command {
            Command::Apply(op) => op,
            Command::Shutdown => break,
        };
        let label = op.label();
        if let Err(err) = apply(&storage, op).await {
            warn!(op = label, error = %err, "persistence write failed");
        }
    }
    rx.close();
    debug!("persistence worker stopped");
}

async fn apply(storage: &Storage, op: PersistOp) -> Result<(), StorageError> {
    match op {
        PersistOp::SaveAnnotation(annotation) => {
            storage.annotations.save_annotation(&annotation).await
        }
        PersistOp::DeleteAnnotation { context_key, id } => {
            storage.annotations.delete_annotation(&context_key, id).await
        }
        PersistOp::SaveAttempt(record) => {
            let id = storage.attempts.append_attempt(&record).await?;
            debug!(attempt_id = id, exam_id = %record.exam_id, "attempt saved");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnnotationDraft, ExamId, HighlightColor};
    use exam_core::time::fixed_now;

    fn annotation(key: &ContextKey) -> Annotation {
        AnnotationDraft {
            context_key: key.clone(),
            text: "memo".into(),
            note: None,
            color: HighlightColor::Yellow,
            start_offset: 0,
            end_offset: 4,
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn ops_apply_in_order_before_shutdown_returns() {
        let storage = Storage::in_memory();
        let queue = PersistenceQueue::spawn(storage.clone());
        let key = ContextKey::question(ExamId::new(1), 1);
        let kept = annotation(&key);
        let removed = annotation(&key);

        assert!(queue.enqueue(PersistOp::SaveAnnotation(kept.clone())));
        assert!(queue.enqueue(PersistOp::SaveAnnotation(removed.clone())));
        assert!(queue.enqueue(PersistOp::DeleteAnnotation {
            context_key: key.clone(),
            id: removed.id(),
        }));
        queue.shutdown().await;

        let stored = storage.annotations.annotations_for_context(&key).await.unwrap();
        assert_eq!(stored, vec![kept]);
    }

    #[tokio::test]
    async fn handles_report_closed_queue() {
        let queue = PersistenceQueue::spawn(Storage::in_memory());
        let handle = queue.handle();
        queue.shutdown().await;

        let key = ContextKey::question(ExamId::new(1), 1);
        assert!(!handle.enqueue(PersistOp::SaveAnnotation(annotation(&key))));
    }
}
