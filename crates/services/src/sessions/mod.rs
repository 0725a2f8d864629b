mod progress;
mod runner;
mod session;
mod timer;
pub mod view;

// Public API of the exam session subsystem.
pub use crate::error::SessionError;
pub use progress::{SessionProgress, SessionState};
pub use runner::{ExamRunner, RunningExam};
pub use session::{ExamSession, TickOutcome};
pub use timer::{CountdownTimer, DEFAULT_TICK, TimerGuard, TimerRegistry};
pub use view::QuestionView;
