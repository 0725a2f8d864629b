//! Built-in demo question bank.

use thiserror::Error;
use toeic_core::model::{ExamDefinition, ExamDraft, ExamError, ExamId, Part, QuestionDraft};

use crate::repository::{ExamWriter, StorageError};

pub const PRACTICE_TEST_ONE: ExamId = ExamId::new(1);
pub const READING_DRILL: ExamId = ExamId::new(2);

/// Every sample exam, ordered by id.
///
/// # Errors
///
/// Returns `ExamError` if a sample fails validation.
pub fn all() -> Result<Vec<ExamDefinition>, ExamError> {
    Ok(vec![practice_test_one()?, reading_drill()?])
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error("no sample exam has id {0}")]
    UnknownExam(ExamId),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Writes the sample exams through `writer`, or only the one with id `only`.
/// Returns the exams written, ordered by id.
///
/// # Errors
///
/// Returns `SeedError::UnknownExam` when `only` names no sample, or the
/// validation or storage error that stopped the write.
pub async fn seed_into(
    writer: &dyn ExamWriter,
    only: Option<ExamId>,
) -> Result<Vec<ExamDefinition>, SeedError> {
    let exams: Vec<_> = all()?
        .into_iter()
        .filter(|exam| only.is_none_or(|id| id == exam.id()))
        .collect();
    if let (Some(id), true) = (only, exams.is_empty()) {
        return Err(SeedError::UnknownExam(id));
    }
    for exam in &exams {
        writer.upsert_exam(exam).await?;
    }
    Ok(exams)
}

fn add(draft: &mut ExamDraft, question: QuestionDraft) -> Result<(), ExamError> {
    let index = draft.questions().len();
    draft
        .add_question(question)
        .map(|_| ())
        .map_err(|source| ExamError::InvalidQuestion { index, source })
}

/// A short exam touching all seven parts.
///
/// # Errors
///
/// Returns `ExamError` if a question fails validation.
pub fn practice_test_one() -> Result<ExamDefinition, ExamError> {
    let mut draft = ExamDraft::new("TOEIC Practice Test 1");
    draft.description = Some("Short mixed-part practice test covering all seven parts.".into());

    add(
        &mut draft,
        QuestionDraft::new(
            Part::Photographs,
            "Look at the picture and choose the best description.",
        )
        .with_image("images/p1-office.svg")
        .with_audio("audio/p1-q1.mp3")
        .with_options(
            [
                "The woman is reading a book in the library.",
                "The woman is typing on a computer.",
                "The woman is writing with a pen.",
                "The woman is talking on the phone.",
            ],
            "B",
        )
        .with_explanation("She is seated at a desk with both hands on a keyboard."),
    )?;
    add(
        &mut draft,
        QuestionDraft::new(
            Part::Photographs,
            "Look at the picture and choose the best description.",
        )
        .with_image("images/p1-street.svg")
        .with_audio("audio/p1-q2.mp3")
        .with_options(
            [
                "Cars are parked along the street.",
                "A bus is stopping at the corner.",
                "People are crossing the road.",
                "The street is being repaired.",
            ],
            "A",
        ),
    )?;

    for (n, correct) in [(1, "A"), (2, "C"), (3, "B")] {
        add(
            &mut draft,
            QuestionDraft::new(
                Part::QuestionResponse,
                "Listen to the question and choose the best response.",
            )
            .with_audio(format!("audio/p2-q{n}.mp3"))
            .with_options(
                [
                    format!("Response A for question {n}"),
                    format!("Response B for question {n}"),
                    format!("Response C for question {n}"),
                ],
                correct,
            ),
        )?;
    }

    add(
        &mut draft,
        QuestionDraft::new(Part::Conversations, "Where most likely are the speakers?")
            .with_audio("audio/p3-conv1.mp3")
            .with_options(["At a bank", "At a hotel", "At a restaurant", "At an airport"], "B")
            .with_explanation("The man asks about checking out of his room."),
    )?;
    add(
        &mut draft,
        QuestionDraft::new(Part::Conversations, "What does the woman offer to do?")
            .with_audio("audio/p3-conv1.mp3")
            .with_options(
                [
                    "Call a taxi",
                    "Store some luggage",
                    "Print a receipt",
                    "Upgrade a room",
                ],
                "B",
            ),
    )?;
    add(
        &mut draft,
        QuestionDraft::new(Part::Talks, "What is the purpose of the announcement?")
            .with_audio("audio/p4-talk1.mp3")
            .with_options(
                [
                    "To report a delay",
                    "To introduce a speaker",
                    "To advertise a product",
                    "To explain a safety rule",
                ],
                "A",
            ),
    )?;

    add(
        &mut draft,
        QuestionDraft::new(
            Part::IncompleteSentences,
            "The company's quarterly report shows a significant _____ in sales compared to last year.",
        )
        .with_options(["increase", "increasing", "increased", "to increase"], "A")
        .with_explanation("A noun is required after the adjective 'significant'."),
    )?;
    add(
        &mut draft,
        QuestionDraft::new(
            Part::IncompleteSentences,
            "Ms. Tanaka will review the proposal _____ the meeting on Friday.",
        )
        .with_options(["since", "before", "during which", "whereas"], "B"),
    )?;

    add(
        &mut draft,
        QuestionDraft::new(Part::TextCompletion, "Choose the best option for blank (1).")
            .with_passage(
                "Dear valued customer, we are pleased to (1) _____ that our new branch \
                 will open next month.",
            )
            .with_options(["announce", "announcing", "announced", "announcement"], "A"),
    )?;
    add(
        &mut draft,
        QuestionDraft::new(
            Part::ReadingComprehension,
            "What is the main purpose of the notice?",
        )
        .with_passage(
            "NOTICE: The staff cafeteria will be closed on Monday for scheduled \
             maintenance. Coffee and snacks will be available in the lobby.",
        )
        .with_options(
            [
                "To announce a temporary closure",
                "To advertise a new menu",
                "To request volunteers",
                "To change working hours",
            ],
            "A",
        ),
    )?;

    draft.build(PRACTICE_TEST_ONE)
}

/// Reading-only drill (parts 5 to 7).
///
/// # Errors
///
/// Returns `ExamError` if a question fails validation.
pub fn reading_drill() -> Result<ExamDefinition, ExamError> {
    let mut draft = ExamDraft::new("Reading Drill");
    let sentences = [
        ("The new policy takes effect _____ January 1.", ["on", "in", "at", "by"], "A"),
        (
            "Please submit your expense reports _____ Friday.",
            ["until", "by", "within", "along"],
            "B",
        ),
        (
            "The manager was _____ impressed with the presentation.",
            ["high", "higher", "highly", "highest"],
            "C",
        ),
    ];
    for (prompt, options, correct) in sentences {
        add(
            &mut draft,
            QuestionDraft::new(Part::IncompleteSentences, prompt).with_options(options, correct),
        )?;
    }
    add(
        &mut draft,
        QuestionDraft::new(Part::ReadingComprehension, "Who is the e-mail most likely for?")
            .with_passage("To: All staff. Subject: Parking lot resurfacing this weekend.")
            .with_options(["Customers", "Employees", "Suppliers", "Investors"], "B"),
    )?;
    draft.build(READING_DRILL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn practice_test_covers_every_part() {
        let exam = practice_test_one().unwrap();
        assert_eq!(exam.parts(), Part::ALL.to_vec());
        assert_eq!(exam.time_budget_minutes(), 120);
        assert_eq!(exam.len(), 12);
    }

    #[test]
    fn reading_drill_is_reading_only() {
        let exam = reading_drill().unwrap();
        assert!(exam.parts().iter().all(|p| p.number() >= 5));
        assert_eq!(exam.time_budget_minutes(), 15 + 30);
    }

    #[tokio::test]
    async fn seeding_writes_every_sample_or_just_one() {
        use crate::repository::{ExamRepository, InMemoryRepository};

        let repo = InMemoryRepository::new();
        let seeded = seed_into(&repo, None).await.unwrap();
        assert_eq!(seeded.len(), 2);
        assert_eq!(repo.list_exams().await.unwrap().len(), 2);

        let only = InMemoryRepository::new();
        let seeded = seed_into(&only, Some(READING_DRILL)).await.unwrap();
        assert_eq!(seeded.len(), 1);
        assert!(only.get_exam(PRACTICE_TEST_ONE).await.unwrap().is_none());
        assert!(only.get_exam(READING_DRILL).await.unwrap().is_some());

        let err = seed_into(&only, Some(ExamId::new(99))).await.unwrap_err();
        assert!(matches!(err, SeedError::UnknownExam(id) if id == ExamId::new(99)));
    }
}
