use chrono::{DateTime, Utc};
use toeic_core::model::{
    AnswerSheet, ExamDefinition, ExamResult, OptionLetter, Question, SessionId, SubmissionReason,
};
use toeic_core::scoring;

use super::progress::{SessionProgress, SessionState};
use crate::error::SessionError;

/// What a single countdown step did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running with this many seconds left.
    Running(u32),
    /// Time ran out on this tick and the session was submitted.
    Expired,
    /// The session was already submitted; nothing changed.
    Inert,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt at an exam.
///
/// Holds the position, the answer sheet and the remaining time. Once
/// submitted the answers are frozen and the result is computed exactly once.
#[derive(Debug, Clone)]
pub struct ExamSession {
    id: SessionId,
    exam: ExamDefinition,
    position: usize,
    answers: AnswerSheet,
    time_limit_secs: u32,
    remaining_secs: u32,
    state: SessionState,
    started_at: DateTime<Utc>,
    result: Option<ExamResult>,
}

impl ExamSession {
    /// Starts an attempt with `time_limit_secs` on the clock.
    ///
    /// `started_at` should come from the services layer clock.
    #[must_use]
    pub fn new(exam: ExamDefinition, time_limit_secs: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            exam,
            position: 0,
            answers: AnswerSheet::new(),
            time_limit_secs,
            remaining_secs: time_limit_secs,
            state: SessionState::Running,
            started_at,
            result: None,
        }
    }

    /// Starts an attempt using the exam's own time budget.
    #[must_use]
    pub fn with_exam_budget(exam: ExamDefinition, started_at: DateTime<Utc>) -> Self {
        let limit = exam.time_budget_secs();
        Self::new(exam, limit, started_at)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.exam.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.exam.question(self.position)
    }

    /// Letter recorded for the current question, if any.
    #[must_use]
    pub fn current_answer(&self) -> Option<OptionLetter> {
        self.current_question()
            .and_then(|q| self.answers.get(q.id()))
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total(),
            answered: self.answers.len(),
            position: self.position,
            remaining_secs: self.remaining_secs,
            time_limit_secs: self.time_limit_secs,
            state: self.state,
        }
    }

    // ─── Answering ─────────────────────────────────────────────────────────────

    /// Records `letter` for the current question, replacing any earlier
    /// choice for that question only. Returns the previous choice.
    ///
    /// Letters are not checked against the question's options; an unknown
    /// letter is kept and simply scores as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` once the attempt is over.
    pub fn select_answer(
        &mut self,
        letter: OptionLetter,
    ) -> Result<Option<OptionLetter>, SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        let Some(question) = self.exam.question(self.position) else {
            return Err(SessionError::OutOfRange {
                index: self.position,
                total: self.total(),
            });
        };
        Ok(self.answers.record(question.id(), letter))
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    /// Moves to `index`. Allowed after submission for review.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OutOfRange` and leaves the position unchanged
    /// if `index` is past the last question.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        let total = self.total();
        if index >= total {
            return Err(SessionError::OutOfRange { index, total });
        }
        self.position = index;
        Ok(())
    }

    /// Advances one question. Returns `false` at the last question.
    pub fn next(&mut self) -> bool {
        let target = self.position + 1;
        self.go_to(target).is_ok()
    }

    /// Steps back one question. Returns `false` at the first question.
    pub fn previous(&mut self) -> bool {
        match self.position.checked_sub(1) {
            Some(target) => self.go_to(target).is_ok(),
            None => false,
        }
    }

    // ─── Countdown / submission ────────────────────────────────────────────────

    /// Applies one elapsed second. Reaching zero submits with
    /// `SubmissionReason::TimeExpired`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.is_submitted() {
            return TickOutcome::Inert;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Running(self.remaining_secs);
        }
        self.finish(SubmissionReason::TimeExpired, now);
        TickOutcome::Expired
    }

    /// Submits the attempt and scores it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if the attempt was already
    /// submitted, manually or by the timer.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<&ExamResult, SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        Ok(self.finish(SubmissionReason::Manual, now))
    }

    fn finish(&mut self, reason: SubmissionReason, now: DateTime<Utc>) -> &ExamResult {
        self.state = SessionState::Submitted;
        let score = scoring::score(&self.exam, &self.answers);
        self.result.insert(ExamResult {
            exam_id: self.exam.id(),
            exam_title: self.exam.title().to_owned(),
            reason,
            time_limit_secs: self.time_limit_secs,
            elapsed_secs: self.time_limit_secs - self.remaining_secs,
            submitted_at: now,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use toeic_core::model::{AnswerStatus, ExamId, Part, QuestionDraft, QuestionId};
    use toeic_core::time::fixed_now;

    fn letter(c: char) -> OptionLetter {
        OptionLetter::new(c).unwrap()
    }

    fn four_question_exam() -> ExamDefinition {
        let questions = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, correct)| {
                QuestionDraft::new(Part::IncompleteSentences, format!("Sentence {}", i + 1))
                    .with_options(["one", "two", "three", "four"], correct)
                    .validate(QuestionId::new(i as u64 + 1))
                    .unwrap()
            })
            .collect();
        ExamDefinition::new(ExamId::new(9), "Session test", None, questions).unwrap()
    }

    fn session(limit: u32) -> ExamSession {
        ExamSession::new(four_question_exam(), limit, fixed_now())
    }

    #[test]
    fn new_session_starts_at_first_question() {
        let s = session(60);
        assert_eq!(s.position(), 0);
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.remaining_secs(), 60);
        assert!(s.answers().is_empty());
        assert!(s.result().is_none());
    }

    #[test]
    fn select_answer_is_idempotent_and_overwrites_only_current() {
        let mut s = session(60);
        assert_eq!(s.select_answer(letter('A')).unwrap(), None);
        assert_eq!(s.select_answer(letter('A')).unwrap(), Some(letter('A')));
        assert_eq!(s.answers().len(), 1);

        assert!(s.next());
        s.select_answer(letter('C')).unwrap();
        s.select_answer(letter('B')).unwrap();

        assert_eq!(s.answers().get(QuestionId::new(1)), Some(letter('A')));
        assert_eq!(s.answers().get(QuestionId::new(2)), Some(letter('B')));
        assert_eq!(s.current_answer(), Some(letter('B')));
    }

    #[test]
    fn navigation_boundaries_are_no_ops() {
        let mut s = session(60);
        assert!(!s.previous());
        assert_eq!(s.position(), 0);

        s.go_to(3).unwrap();
        assert!(!s.next());
        assert_eq!(s.position(), 3);
        assert!(s.previous());
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn go_to_rejects_out_of_range() {
        let mut s = session(60);
        s.go_to(1).unwrap();
        let err = s.go_to(4).unwrap_err();
        assert!(matches!(err, SessionError::OutOfRange { index: 4, total: 4 }));
        assert_eq!(s.position(), 1);
    }

    #[test]
    fn scoring_scenario_two_of_four() {
        let mut s = session(60);
        s.select_answer(letter('A')).unwrap();
        s.next();
        s.select_answer(letter('B')).unwrap();
        s.next();
        s.select_answer(letter('X')).unwrap();

        let result = s.submit(fixed_now()).unwrap().clone();
        assert_eq!(result.reason, SubmissionReason::Manual);
        assert_eq!(result.score.tally.correct, 2);
        assert_eq!(result.percentage(), 50);
        assert_eq!(
            result.score.status_of(QuestionId::new(3)),
            Some(AnswerStatus::Incorrect)
        );
        assert_eq!(
            result.score.status_of(QuestionId::new(4)),
            Some(AnswerStatus::Unanswered)
        );
    }

    #[test]
    fn five_second_timer_submits_once() {
        let mut s = session(5);
        let mut now = fixed_now();
        let mut previous = s.remaining_secs();
        for expected in (1..=4).rev() {
            now += Duration::seconds(1);
            assert_eq!(s.tick(now), TickOutcome::Running(expected));
            assert!(s.remaining_secs() < previous);
            previous = s.remaining_secs();
        }
        now += Duration::seconds(1);
        assert_eq!(s.tick(now), TickOutcome::Expired);
        assert!(s.is_submitted());
        assert_eq!(s.remaining_secs(), 0);

        let first = s.result().cloned().unwrap();
        assert_eq!(first.reason, SubmissionReason::TimeExpired);
        assert_eq!(first.elapsed_secs, 5);
        assert_eq!(first.submitted_at, now);

        for _ in 0..3 {
            assert_eq!(s.tick(now + Duration::seconds(10)), TickOutcome::Inert);
        }
        assert_eq!(s.remaining_secs(), 0);
        assert_eq!(s.result(), Some(&first));
    }

    #[test]
    fn submitted_session_is_frozen() {
        let mut s = session(60);
        s.select_answer(letter('A')).unwrap();
        s.tick(fixed_now());
        let elapsed = s.submit(fixed_now()).unwrap().elapsed_secs;
        assert_eq!(elapsed, 1);

        assert!(matches!(
            s.select_answer(letter('B')),
            Err(SessionError::AlreadySubmitted)
        ));
        assert!(matches!(
            s.submit(fixed_now()),
            Err(SessionError::AlreadySubmitted)
        ));
        assert_eq!(s.answers().get(QuestionId::new(1)), Some(letter('A')));

        // review navigation still works
        assert!(s.next());
        assert_eq!(s.progress().state, SessionState::Submitted);
        assert_eq!(s.progress().position, 1);
    }

    #[test]
    fn zero_limit_expires_on_first_tick() {
        let mut s = session(0);
        assert_eq!(s.tick(fixed_now()), TickOutcome::Expired);
        assert_eq!(s.result().unwrap().elapsed_secs, 0);
    }

    #[test]
    fn exam_budget_drives_default_limit() {
        let s = ExamSession::with_exam_budget(four_question_exam(), fixed_now());
        assert_eq!(s.time_limit_secs(), 15 * 60);
    }
}
