#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod sessions;

pub use toeic_core::Clock;

pub use catalog::{CatalogService, SetupPreview};
pub use error::{CatalogError, SessionError};
pub use sessions::{
    CountdownTimer, ExamRunner, ExamSession, QuestionView, RunningExam, SessionProgress,
    SessionState, TickOutcome, TimerGuard, TimerRegistry,
};
