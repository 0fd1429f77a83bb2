#![forbid(unsafe_code)]

pub mod annotations;
pub mod error;
pub mod highlight;
pub mod model;
pub mod sections;
pub mod session;
pub mod time;

pub use annotations::AnnotationStore;
pub use error::Error;
pub use sections::{QuestionLayout, SectionCatalog, SectionResolver};
pub use session::{SessionPhase, SessionSnapshot, SessionState, TickOutcome};
pub use time::Clock;
