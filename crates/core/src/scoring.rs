//! Scoring of an answer sheet against an exam definition.

use std::collections::BTreeMap;

use crate::model::{
    AnswerDetail, AnswerSheet, AnswerStatus, ExamDefinition, Part, PartBreakdown, Question,
    ScoreCard, Section, SectionBreakdown, Tally,
};

/// Classifies one question against the sheet.
#[must_use]
pub fn grade(question: &Question, answers: &AnswerSheet) -> AnswerStatus {
    match answers.get(question.id()) {
        None => AnswerStatus::Unanswered,
        Some(selected) if question.is_correct(selected) => AnswerStatus::Correct,
        Some(_) => AnswerStatus::Incorrect,
    }
}

/// Scores `answers` against `exam`.
///
/// Answers for questions outside the exam are ignored.
#[must_use]
pub fn score(exam: &ExamDefinition, answers: &AnswerSheet) -> ScoreCard {
    let mut overall = Tally::default();
    let mut by_part: BTreeMap<Part, Tally> = BTreeMap::new();
    let mut by_section: BTreeMap<Section, Tally> = BTreeMap::new();
    let mut details = Vec::with_capacity(exam.len());

    for (idx, question) in exam.questions().iter().enumerate() {
        let status = grade(question, answers);
        overall.add(status);
        by_part.entry(question.part()).or_default().add(status);
        by_section
            .entry(question.part().section())
            .or_default()
            .add(status);

        details.push(AnswerDetail {
            number: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            question_id: question.id(),
            part: question.part(),
            selected: answers.get(question.id()),
            correct: question.correct(),
            status,
            explanation: question.explanation().map(ToOwned::to_owned),
        });
    }

    let parts = by_part
        .into_iter()
        .map(|(part, tally)| PartBreakdown {
            part,
            name: part.name().to_owned(),
            total: tally.total(),
            percentage: tally.percentage(),
            tally,
        })
        .collect();

    let sections = by_section
        .into_iter()
        .map(|(section, tally)| SectionBreakdown {
            section,
            total: tally.total(),
            percentage: tally.percentage(),
            tally,
        })
        .collect();

    ScoreCard {
        total: overall.total(),
        percentage: overall.percentage(),
        tally: overall,
        parts,
        sections,
        answers: details,
    }
}
