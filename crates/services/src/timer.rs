//! Countdown task driving an `ExamSession`.

use std::sync::Arc;
use std::time::Duration;

use exam_core::{SessionPhase, TickOutcome};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::exam_session::ExamSession;

/// Handle to a running countdown.
///
/// The task ticks the session once per `period` of running time and ends on
/// expiry, on submission, on `stop()`, or when the handle is dropped.
/// Resuming a paused session restarts the period, so time spent paused is
/// never charged.
pub struct SessionTimer {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionTimer {
    /// Spawns the countdown on the current tokio runtime.
    ///
    /// With `auto_submit`, the session is submitted as soon as time runs out.
    #[must_use]
    pub fn spawn(session: Arc<Mutex<ExamSession>>, period: Duration, auto_submit: bool) -> Self {
        let (cancel, cancelled) = oneshot::channel();
        let task = tokio::spawn(run(session, period, auto_submit, cancelled));
        Self {
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// Asks the task to stop after its current tick.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already have ended on its own.
            let _ = cancel.send(());
        }
    }

    /// Waits for the task to end.
    pub async fn join(mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(err) = task.await {
            if !err.is_cancelled() {
                warn!(error = %err, "session timer ended abnormally");
            }
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    session: Arc<Mutex<ExamSession>>,
    period: Duration,
    auto_submit: bool,
    mut cancelled: oneshot::Receiver<()>,
) {
    let mut phases = session.lock().await.watch_phase();
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let phase = *phases.borrow_and_update();
        match phase {
            SessionPhase::Expired | SessionPhase::Submitted => {
                debug!(?phase, "session timer finished");
                return;
            }
            SessionPhase::Paused => {
                tokio::select! {
                    _ = &mut cancelled => {
                        debug!("session timer stopped");
                        return;
                    }
                    changed = phases.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if *phases.borrow() == SessionPhase::Running {
                            interval.reset();
                        }
                    }
                }
                continue;
            }
            SessionPhase::Running => {}
        }

        tokio::select! {
            _ = &mut cancelled => {
                debug!("session timer stopped");
                return;
            }
            changed = phases.changed() => {
                if changed.is_err() {
                    return;
                }
                // Running again means a pause and resume both landed since
                // the last wake-up.
                if *phases.borrow() == SessionPhase::Running {
                    interval.reset();
                }
                continue;
            }
            _ = interval.tick() => {}
        }

        let mut guard = session.lock().await;
        if guard.tick() == TickOutcome::Expired {
            if auto_submit {
                guard.submit();
            }
            debug!("session timer finished on expiry");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam_session::{SessionEvent, SessionEvents};
    use exam_core::SectionCatalog;
    use exam_core::model::{ExamDefinition, ExamId, ExamKind, Question};
    use exam_core::time::fixed_clock;

    fn session(minutes: u32) -> (Arc<Mutex<ExamSession>>, SessionEvents) {
        let questions = (1..=50)
            .map(|number| Question {
                number,
                passage: None,
                prompt: format!("Q{number}"),
                options: vec!["a".into(), "b".into()],
                correct: 0,
            })
            .collect();
        let definition =
            ExamDefinition::new(ExamId::new(1), "Listening", ExamKind::Listening, minutes, questions)
                .unwrap();
        let resolver = SectionCatalog::builtin().unwrap().resolver(ExamKind::Listening);
        let (session, events) =
            ExamSession::start(Arc::new(definition), resolver, fixed_clock()).unwrap();
        (Arc::new(Mutex::new(session)), events)
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_auto_submits() {
        let (session, mut events) = session(1);
        let timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);

        time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 30);

        timer.join().await;
        let guard = session.lock().await;
        assert_eq!(guard.remaining_seconds(), 0);
        assert!(guard.is_submitted());
        drop(guard);

        assert_eq!(events.recv().await, Some(SessionEvent::TimeExpired));
        let Some(SessionEvent::Submitted(record)) = events.recv().await else {
            panic!("expected submission");
        };
        assert!(record.expired);
        assert!(events.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_keeps_its_time() {
        let (session, _events) = session(10);
        let _timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);

        time::sleep(Duration::from_millis(100_500)).await;
        assert!(session.lock().await.pause());
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 500);

        assert!(session.lock().await.resume());
        time::sleep(Duration::from_millis(50_200)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 450);
    }

    #[tokio::test(start_paused = true)]
    async fn short_running_windows_are_not_charged() {
        let (session, _events) = session(10);
        let _timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);

        time::sleep(Duration::from_millis(50)).await;
        assert!(session.lock().await.pause());
        for _ in 0..10 {
            time::sleep(Duration::from_millis(900)).await;
            assert!(session.lock().await.resume());
            time::sleep(Duration::from_millis(100)).await;
            assert!(session.lock().await.pause());
        }
        assert_eq!(session.lock().await.remaining_seconds(), 600);

        assert!(session.lock().await.resume());
        time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 599);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_without_auto_submit_leaves_attempt_open() {
        let (session, mut events) = session(1);
        let timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), false);
        timer.join().await;

        assert_eq!(session.lock().await.phase(), SessionPhase::Expired);
        assert_eq!(events.drain(), vec![SessionEvent::TimeExpired]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_drop_end_the_countdown() {
        let (session, _events) = session(10);
        let mut timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);
        time::sleep(Duration::from_millis(5_500)).await;
        timer.stop();
        timer.join().await;
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 595);

        let dropped = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);
        drop(dropped);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(session.lock().await.remaining_seconds(), 595);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_ends_the_timer() {
        let (session, _events) = session(10);
        let timer = SessionTimer::spawn(Arc::clone(&session), Duration::from_secs(1), true);
        time::sleep(Duration::from_millis(2_500)).await;
        assert!(session.lock().await.submit().is_some());

        timer.join().await;
        assert_eq!(session.lock().await.remaining_seconds(), 598);
    }
}
