use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use toeic_core::model::{ExamId, ExamResult, ExamSetup, OptionLetter};
use storage::repository::ExamRepository;

use super::progress::SessionProgress;
use super::session::{ExamSession, TickOutcome};
use super::timer::{CountdownTimer, DEFAULT_TICK, TimerGuard, TimerRegistry};
use crate::Clock;
use crate::error::SessionError;

/// Loads exams from the question bank and runs timed attempts over them.
#[derive(Clone)]
pub struct ExamRunner {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    tick: Duration,
    timers: TimerRegistry,
}

impl ExamRunner {
    #[must_use]
    pub fn new(clock: Clock, exams: Arc<dyn ExamRepository>) -> Self {
        Self {
            clock,
            exams,
            tick: DEFAULT_TICK,
            timers: TimerRegistry::new(),
        }
    }

    /// Overrides the countdown resolution.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, timers: TimerRegistry) -> Self {
        self.timers = timers;
        self
    }

    #[must_use]
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Loads `exam_id`, restricts it to the selected parts and starts the
    /// countdown for the configured time limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamNotFound` if the bank has no such exam,
    /// `SessionError::Exam` if the selection leaves no questions, or
    /// `SessionError::Storage` on provider failures.
    pub async fn start(
        &self,
        exam_id: ExamId,
        setup: &ExamSetup,
    ) -> Result<RunningExam, SessionError> {
        let Some(exam) = self.exams.get_exam(exam_id).await? else {
            tracing::warn!(exam_id = %exam_id, "exam not found");
            return Err(SessionError::ExamNotFound(exam_id));
        };
        let exam = exam
            .select(setup.parts())?
            .with_time_budget(setup.time_limit_minutes())?;

        let session = ExamSession::with_exam_budget(exam, self.clock.now());
        tracing::info!(
            exam_id = %exam_id,
            session_id = %session.id(),
            parts = %setup.parts(),
            questions = session.total(),
            time_limit_secs = session.time_limit_secs(),
            "exam started"
        );
        Ok(self.launch(session))
    }

    /// Runs an already built session under this runner's countdown.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn launch(&self, session: ExamSession) -> RunningExam {
        let (updates, _) = watch::channel(session.progress());
        let shared = Arc::new(Shared {
            clock: self.clock,
            live: Mutex::new(Live {
                session,
                timer: None,
            }),
            updates,
        });

        // The slot is filled while the lock is held so the first tick always
        // finds its own guard.
        if let Ok(mut live) = shared.live.lock() {
            if !live.session.is_submitted() {
                let weak = Arc::downgrade(&shared);
                let guard = CountdownTimer::new(self.tick)
                    .with_registry(self.timers.clone())
                    .start(move || on_tick(&weak));
                live.timer = Some(guard);
            }
        }

        RunningExam { shared }
    }
}

fn on_tick(shared: &Weak<Shared>) -> ControlFlow<()> {
    let Some(shared) = shared.upgrade() else {
        return ControlFlow::Break(());
    };
    let Ok(mut live) = shared.live.lock() else {
        tracing::warn!("session state poisoned; stopping countdown");
        return ControlFlow::Break(());
    };

    let flow = match live.session.tick(shared.clock.now()) {
        TickOutcome::Running(_) => ControlFlow::Continue(()),
        TickOutcome::Expired => {
            tracing::info!(
                session_id = %live.session.id(),
                "time expired; exam submitted automatically"
            );
            live.release_timer();
            ControlFlow::Break(())
        }
        TickOutcome::Inert => ControlFlow::Break(()),
    };
    shared.publish(&live);
    flow
}

struct Shared {
    clock: Clock,
    live: Mutex<Live>,
    updates: watch::Sender<SessionProgress>,
}

struct Live {
    session: ExamSession,
    timer: Option<TimerGuard>,
}

impl Live {
    fn release_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
            tracing::debug!(session_id = %self.session.id(), "countdown released");
        }
    }
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Live>, SessionError> {
        self.live.lock().map_err(|_| SessionError::StatePoisoned)
    }

    fn publish(&self, live: &Live) {
        self.updates.send_replace(live.session.progress());
    }
}

//
// ─── RUNNING EXAM ──────────────────────────────────────────────────────────────
//

/// Handle to one attempt in progress.
///
/// Every action and every tick goes through the same lock, so the countdown
/// never observes a half-applied update. Dropping the handle stops the
/// countdown.
pub struct RunningExam {
    shared: Arc<Shared>,
}

impl RunningExam {
    /// Records an answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` after submission.
    pub fn select_answer(
        &self,
        letter: OptionLetter,
    ) -> Result<Option<OptionLetter>, SessionError> {
        self.mutate(|session| session.select_answer(letter))
    }

    /// Jumps to a question by zero-based index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OutOfRange` for an index past the end.
    pub fn go_to(&self, index: usize) -> Result<(), SessionError> {
        self.mutate(|session| session.go_to(index))
    }

    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session lock is poisoned.
    pub fn next(&self) -> Result<bool, SessionError> {
        self.mutate(|session| Ok(session.next()))
    }

    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session lock is poisoned.
    pub fn previous(&self) -> Result<bool, SessionError> {
        self.mutate(|session| Ok(session.previous()))
    }

    /// Submits the attempt and stops the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if the attempt was already
    /// submitted, including by the timer.
    pub fn submit(&self) -> Result<ExamResult, SessionError> {
        let mut live = self.shared.lock()?;
        let now = self.shared.clock.now();
        let result = live.session.submit(now)?.clone();
        live.release_timer();
        tracing::info!(
            session_id = %live.session.id(),
            percentage = result.percentage(),
            elapsed_secs = result.elapsed_secs,
            "exam submitted"
        );
        self.shared.publish(&live);
        Ok(result)
    }

    /// Latest published progress.
    #[must_use]
    pub fn snapshot(&self) -> SessionProgress {
        self.shared.updates.borrow().clone()
    }

    /// The result, once submitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session lock is poisoned.
    pub fn result(&self) -> Result<Option<ExamResult>, SessionError> {
        Ok(self.shared.lock()?.session.result().cloned())
    }

    /// Read access to the session, e.g. to render the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session lock is poisoned.
    pub fn with_session<R>(&self, f: impl FnOnce(&ExamSession) -> R) -> Result<R, SessionError> {
        Ok(f(&self.shared.lock()?.session))
    }

    /// Progress updates, sent on every tick and every action.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionProgress> {
        self.shared.updates.subscribe()
    }

    /// Waits until the attempt is submitted, manually or by the timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdatesClosed` if the progress channel closes
    /// first, or `SessionError::StatePoisoned` if the session lock is poisoned.
    pub async fn wait_until_submitted(&self) -> Result<ExamResult, SessionError> {
        let mut rx = self.subscribe();
        rx.wait_for(SessionProgress::is_submitted).await?;
        self.result()?.ok_or(SessionError::StatePoisoned)
    }

    /// `true` while the countdown task is held by this attempt.
    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.shared
            .live
            .lock()
            .is_ok_and(|live| live.timer.is_some())
    }

    /// Ends the attempt without submitting and stops the countdown.
    pub fn close(self) {
        drop(self);
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut ExamSession) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let mut live = self.shared.lock()?;
        let out = f(&mut live.session)?;
        self.shared.publish(&live);
        Ok(out)
    }
}

impl Drop for RunningExam {
    fn drop(&mut self) {
        match self.shared.live.lock() {
            Ok(mut live) => live.release_timer(),
            Err(poisoned) => poisoned.into_inner().release_timer(),
        }
    }
}
