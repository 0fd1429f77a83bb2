#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod exam_services;
pub mod exam_session;
pub mod persistence;
pub mod timer;

pub use exam_core::Clock;

pub use config::ExamConfig;
pub use error::{ConfigError, ExamServicesError, SessionError};
pub use exam_services::{ExamServices, RunningExam};
pub use exam_session::{ExamSession, SessionEvent, SessionEvents};
pub use persistence::{PersistOp, PersistenceHandle, PersistenceQueue};
pub use timer::SessionTimer;
