use std::sync::Arc;

use exam_core::SectionCatalog;
use exam_core::highlight::RenderMode;
use exam_core::model::{ContextKey, ExamDefinition, ExamId};
use storage::repository::{AttemptRow, Storage};
use tokio::sync::Mutex;
use tracing::info;

use crate::Clock;
use crate::config::ExamConfig;
use crate::error::ExamServicesError;
use crate::exam_session::{ExamSession, SessionEvents};
use crate::persistence::PersistenceQueue;
use crate::timer::SessionTimer;

/// A started exam: the shared session, its event stream and its countdown.
pub struct RunningExam {
    pub session: Arc<Mutex<ExamSession>>,
    pub events: SessionEvents,
    pub timer: SessionTimer,
}

/// Assembles storage, section tables and the persistence worker.
pub struct ExamServices {
    config: ExamConfig,
    clock: Clock,
    catalog: SectionCatalog,
    storage: Storage,
    persistence: PersistenceQueue,
}

impl ExamServices {
    /// Build services backed by `SQLite` at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if the section tables or storage cannot be
    /// initialized.
    pub async fn new_sqlite(config: ExamConfig, clock: Clock) -> Result<Self, ExamServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Self::with_storage(config, clock, storage)
    }

    /// Build services backed by in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if the section tables cannot be loaded.
    pub fn in_memory(config: ExamConfig, clock: Clock) -> Result<Self, ExamServicesError> {
        Self::with_storage(config, clock, Storage::in_memory())
    }

    /// Build services over an existing storage aggregate.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if the section tables cannot be loaded.
    pub fn with_storage(
        config: ExamConfig,
        clock: Clock,
        storage: Storage,
    ) -> Result<Self, ExamServicesError> {
        let catalog = config.load_catalog()?;
        let persistence = PersistenceQueue::spawn(storage.clone());
        Ok(Self {
            config,
            clock,
            catalog,
            storage,
            persistence,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn render_mode(&self) -> RenderMode {
        self.config.render_mode
    }

    #[must_use]
    pub fn catalog(&self) -> &SectionCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Starts an attempt: loads saved annotations for every question and
    /// passage context of the paper, then starts the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError` if the paper does not match its section
    /// table or annotations cannot be loaded.
    pub async fn start_exam(
        &self,
        definition: Arc<ExamDefinition>,
    ) -> Result<RunningExam, ExamServicesError> {
        let resolver = self.catalog.resolver(definition.kind());
        let exam_id = definition.id();
        let count = definition.question_count();
        let (mut session, events) = ExamSession::start(definition, resolver, self.clock)?;

        let mut restored = 0_usize;
        for number in 1..=count {
            for key in [
                ContextKey::question(exam_id, number),
                ContextKey::passage(exam_id, number),
            ] {
                let saved = self.storage.annotations.annotations_for_context(&key).await?;
                restored += saved.len();
                session.hydrate_annotations(&key, saved);
            }
        }
        info!(exam_id = %exam_id, restored, "annotations restored");

        let session = Arc::new(Mutex::new(
            session.with_persistence(self.persistence.handle()),
        ));
        let timer = SessionTimer::spawn(
            Arc::clone(&session),
            self.config.tick,
            self.config.auto_submit,
        );
        Ok(RunningExam {
            session,
            events,
            timer,
        })
    }

    /// Previous attempts for an exam, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ExamServicesError::Storage` on backend failures.
    pub async fn attempts(&self, exam_id: ExamId) -> Result<Vec<AttemptRow>, ExamServicesError> {
        Ok(self.storage.attempts.attempts_for_exam(exam_id).await?)
    }

    /// Flushes queued writes and stops the persistence worker.
    pub async fn shutdown(self) {
        self.persistence.shutdown().await;
    }
}
