use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ExamId, QuestionId};
use crate::model::part::{Part, Section};
use crate::model::question::OptionLetter;

/// Outcome of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Unanswered,
}

/// Why a session left the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionReason {
    Manual,
    TimeExpired,
}

/// Correct / incorrect / unanswered tally for a slice of the exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
}

impl Tally {
    pub(crate) fn add(&mut self, status: AnswerStatus) {
        match status {
            AnswerStatus::Correct => self.correct = self.correct.saturating_add(1),
            AnswerStatus::Incorrect => self.incorrect = self.incorrect.saturating_add(1),
            AnswerStatus::Unanswered => self.unanswered = self.unanswered.saturating_add(1),
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect + self.unanswered
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// `round(100 * correct / total)`, halves rounding up. Zero for an empty
    /// tally.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        percentage(self.correct, self.total())
    }
}

pub(crate) fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBreakdown {
    pub part: Part,
    pub name: String,
    #[serde(flatten)]
    pub tally: Tally,
    pub total: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBreakdown {
    pub section: Section,
    #[serde(flatten)]
    pub tally: Tally,
    pub total: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDetail {
    /// 1-based position in the attempted exam.
    pub number: u32,
    pub question_id: QuestionId,
    pub part: Part,
    pub selected: Option<OptionLetter>,
    pub correct: OptionLetter,
    pub status: AnswerStatus,
    pub explanation: Option<String>,
}

/// Scoring of an answer sheet against an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    #[serde(flatten)]
    pub tally: Tally,
    pub total: u32,
    pub percentage: u8,
    pub parts: Vec<PartBreakdown>,
    pub sections: Vec<SectionBreakdown>,
    pub answers: Vec<AnswerDetail>,
}

impl ScoreCard {
    #[must_use]
    pub fn part(&self, part: Part) -> Option<&PartBreakdown> {
        self.parts.iter().find(|p| p.part == part)
    }

    #[must_use]
    pub fn section(&self, section: Section) -> Option<&SectionBreakdown> {
        self.sections.iter().find(|s| s.section == section)
    }

    #[must_use]
    pub fn status_of(&self, question: QuestionId) -> Option<AnswerStatus> {
        self.answers
            .iter()
            .find(|a| a.question_id == question)
            .map(|a| a.status)
    }
}

/// Summary of a submitted attempt, computed once at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub exam_id: ExamId,
    pub exam_title: String,
    pub reason: SubmissionReason,
    pub time_limit_secs: u32,
    pub elapsed_secs: u32,
    pub submitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub score: ScoreCard,
}

impl ExamResult {
    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.score.percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn tally_totals() {
        let mut tally = Tally::default();
        tally.add(AnswerStatus::Correct);
        tally.add(AnswerStatus::Incorrect);
        tally.add(AnswerStatus::Unanswered);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.answered(), 2);
        assert_eq!(tally.percentage(), 33);
    }
}
