use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle of a single exam attempt.
///
/// `Running ⇄ Paused`, `Running → Expired` when the clock hits zero, and any
/// non-terminal phase `→ Submitted`. Nothing leaves `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Running,
    Paused,
    Expired,
    Submitted,
}

/// Result of a single timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second elapsed; the clock is still above zero.
    Ticked { remaining_seconds: u32 },
    /// The clock just reached zero. Returned once per session.
    Expired,
    /// The timer was not running; nothing changed.
    Idle,
}

/// Frozen copy of an attempt handed to scoring at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub answers: BTreeMap<u32, usize>,
    pub remaining_seconds: u32,
    pub expired: bool,
}

/// Answers, countdown and phase for one exam attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    answers: BTreeMap<u32, usize>,
    remaining_seconds: u32,
    phase: SessionPhase,
    expired: bool,
}

impl SessionState {
    /// Starts a running attempt with `time_limit_minutes × 60` seconds on the clock.
    #[must_use]
    pub fn new(time_limit_minutes: u32) -> Self {
        Self::with_seconds(time_limit_minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn with_seconds(remaining_seconds: u32) -> Self {
        Self {
            answers: BTreeMap::new(),
            remaining_seconds,
            phase: SessionPhase::Running,
            expired: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// True while the countdown should advance.
    #[must_use]
    pub fn timer_active(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<u32, usize> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: u32) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    /// Number of distinct questions answered.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Records `option` for `index`, replacing any earlier choice.
    ///
    /// Returns `false` (and changes nothing) once the clock has expired or the
    /// attempt was submitted.
    pub fn set_answer(&mut self, index: u32, option: usize) -> bool {
        if matches!(self.phase, SessionPhase::Expired | SessionPhase::Submitted) {
            return false;
        }
        self.answers.insert(index, option);
        true
    }

    /// Advances the countdown by one second while running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::Running {
            return TickOutcome::Idle;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.phase = SessionPhase::Expired;
            self.expired = true;
            debug!("exam clock expired");
            return TickOutcome::Expired;
        }
        TickOutcome::Ticked {
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Stops the countdown. Returns whether the phase changed.
    pub fn pause(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        self.phase = SessionPhase::Paused;
        debug!(remaining = self.remaining_seconds, "exam paused");
        true
    }

    /// Restarts a paused countdown. Returns whether the phase changed.
    pub fn resume(&mut self) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.phase = SessionPhase::Running;
        debug!(remaining = self.remaining_seconds, "exam resumed");
        true
    }

    /// Freezes the attempt and returns its snapshot.
    ///
    /// Only the first call yields a snapshot; later calls return `None`.
    pub fn submit(&mut self) -> Option<SessionSnapshot> {
        if self.phase == SessionPhase::Submitted {
            return None;
        }
        self.phase = SessionPhase::Submitted;
        debug!(answered = self.answers.len(), "exam submitted");
        Some(self.snapshot())
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            answers: self.answers.clone(),
            remaining_seconds: self.remaining_seconds,
            expired: self.expired,
        }
    }
}
