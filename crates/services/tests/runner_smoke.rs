use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use services::{Clock, ExamRunner, ExamSession, SessionError, SessionState, TimerRegistry};
use storage::repository::{ExamRepository, InMemoryRepository, StorageError};
use storage::sample;
use toeic_core::model::{
    ExamDefinition, ExamId, ExamSetup, ExamSummary, OptionLetter, Part, SubmissionReason,
};
use toeic_core::time::fixed_now;

fn runner(registry: &TimerRegistry) -> ExamRunner {
    let repo = InMemoryRepository::with_exams(sample::all().unwrap());
    ExamRunner::new(Clock::fixed(fixed_now()), Arc::new(repo)).with_registry(registry.clone())
}

fn letter(c: char) -> OptionLetter {
    OptionLetter::new(c).unwrap()
}

#[tokio::test(start_paused = true)]
async fn five_second_exam_auto_submits_exactly_once() {
    let registry = TimerRegistry::new();
    let exam = sample::reading_drill().unwrap();
    let running = runner(&registry).launch(ExamSession::new(exam, 5, fixed_now()));
    assert_eq!(registry.pending(), 1);

    running.select_answer(letter('A')).unwrap();
    let mut updates = running.subscribe();

    let result = running.wait_until_submitted().await.unwrap();
    assert_eq!(result.reason, SubmissionReason::TimeExpired);
    assert_eq!(result.elapsed_secs, 5);
    assert_eq!(result.score.tally.correct, 1);
    assert_eq!(registry.pending(), 0);
    assert!(!running.has_timer());

    assert!(updates.has_changed().unwrap());
    let published = updates.borrow_and_update().clone();
    assert!(published.is_submitted());
    assert_eq!(published.remaining_secs, 0);
    assert_eq!(published.answered, 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = running.snapshot();
    assert_eq!(snapshot.state, SessionState::Submitted);
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(running.result().unwrap(), Some(result));
    assert!(matches!(running.submit(), Err(SessionError::AlreadySubmitted)));
    assert!(matches!(
        running.select_answer(letter('B')),
        Err(SessionError::AlreadySubmitted)
    ));
}

#[tokio::test(start_paused = true)]
async fn start_applies_part_selection_and_time_limit() {
    let registry = TimerRegistry::new();
    let setup = ExamSetup::from_query_str("parts=1,2").unwrap();
    let running = runner(&registry)
        .start(sample::PRACTICE_TEST_ONE, &setup)
        .await
        .unwrap();

    let snapshot = running.snapshot();
    assert_eq!(snapshot.total, 5);
    assert_eq!(snapshot.time_limit_secs, 25 * 60);
    assert_eq!(snapshot.remaining_secs, 25 * 60);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(running.snapshot().remaining_secs, 25 * 60 - 3);

    let parts = running
        .with_session(|s| s.exam().parts())
        .unwrap();
    assert_eq!(parts, vec![Part::Photographs, Part::QuestionResponse]);
}

#[tokio::test(start_paused = true)]
async fn manual_submit_releases_timer() {
    let registry = TimerRegistry::new();
    let setup = ExamSetup::from_query(None, Some("30")).unwrap();
    let running = runner(&registry)
        .start(sample::READING_DRILL, &setup)
        .await
        .unwrap();
    assert_eq!(running.snapshot().time_limit_secs, 30 * 60);

    running.select_answer(letter('A')).unwrap();
    assert!(running.next().unwrap());
    running.select_answer(letter('B')).unwrap();
    assert!(running.previous().unwrap());
    assert!(!running.previous().unwrap());
    assert!(matches!(
        running.go_to(99),
        Err(SessionError::OutOfRange { index: 99, total: 4 })
    ));

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let result = running.submit().unwrap();
    assert_eq!(result.reason, SubmissionReason::Manual);
    assert_eq!(result.elapsed_secs, 2);
    assert_eq!(result.score.tally.correct, 2);
    assert_eq!(result.percentage(), 50);
    assert_eq!(registry.pending(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(running.snapshot().remaining_secs, 30 * 60 - 2);
}

#[tokio::test(start_paused = true)]
async fn waiting_after_manual_submit_returns_stored_result() {
    let registry = TimerRegistry::new();
    let running = runner(&registry)
        .start(sample::READING_DRILL, &ExamSetup::full_exam())
        .await
        .unwrap();
    running.select_answer(letter('A')).unwrap();

    let submitted = running.submit().unwrap();
    let waited = running.wait_until_submitted().await.unwrap();
    assert_eq!(waited, submitted);
    assert_eq!(waited.reason, SubmissionReason::Manual);
    assert_eq!(registry.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn close_and_drop_release_timers() {
    let registry = TimerRegistry::new();
    let runner = runner(&registry);
    let setup = ExamSetup::full_exam();

    let first = runner.start(sample::PRACTICE_TEST_ONE, &setup).await.unwrap();
    let second = runner.start(sample::READING_DRILL, &setup).await.unwrap();
    assert_eq!(registry.pending(), 2);

    first.close();
    assert_eq!(registry.pending(), 1);

    drop(second);
    assert_eq!(registry.pending(), 0);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(registry.pending(), 0);
}

#[tokio::test]
async fn unknown_exam_is_not_found() {
    let registry = TimerRegistry::new();
    let err = runner(&registry)
        .start(ExamId::new(404), &ExamSetup::full_exam())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::ExamNotFound(id) if id == ExamId::new(404)));
    assert_eq!(registry.pending(), 0);
}

#[tokio::test]
async fn selection_without_questions_is_rejected() {
    let registry = TimerRegistry::new();
    let setup = ExamSetup::from_query(Some("3"), None).unwrap();
    let err = runner(&registry)
        .start(sample::READING_DRILL, &setup)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Exam(_)));
}

struct BrokenBank;

#[async_trait]
impl ExamRepository for BrokenBank {
    async fn get_exam(&self, _id: ExamId) -> Result<Option<ExamDefinition>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn provider_failures_propagate() {
    let runner = ExamRunner::new(Clock::fixed(fixed_now()), Arc::new(BrokenBank));
    let err = runner
        .start(ExamId::new(1), &ExamSetup::full_exam())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Storage(StorageError::Connection(_))));
}
