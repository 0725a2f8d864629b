use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};
use crate::model::part::Part;
use crate::model::question::{Question, QuestionDraft, QuestionError};
use crate::model::selection::{FULL_EXAM_MINUTES, PartSelection};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("exam must contain at least one question")]
    NoQuestions,

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("no questions match the selected parts ({selection})")]
    EmptySelection { selection: String },

    #[error("time budget must be > 0 minutes")]
    ZeroTimeBudget,

    #[error("question {index}: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

//
// ─── EXAM DEFINITION ───────────────────────────────────────────────────────────
//

/// A titled, ordered set of questions with a time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDefinition {
    id: ExamId,
    title: String,
    description: Option<String>,
    questions: Vec<Question>,
    time_budget_minutes: u32,
}

/// Default budget for the given parts: the fixed full-exam time when every
/// part is present, otherwise the sum of standard part durations.
fn default_budget(parts: &[Part]) -> u32 {
    if parts.len() == Part::ALL.len() {
        FULL_EXAM_MINUTES
    } else {
        parts.iter().map(|p| p.standard_minutes()).sum()
    }
}

impl ExamDefinition {
    /// Creates an exam definition with the default time budget for the parts
    /// it contains.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` for an empty title, no questions or duplicate
    /// question ids.
    pub fn new(
        id: ExamId,
        title: impl Into<String>,
        description: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(ExamError::DuplicateQuestion(q.id()));
            }
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let mut exam = Self {
            id,
            title: title.trim().to_owned(),
            description,
            questions,
            time_budget_minutes: 0,
        };
        exam.time_budget_minutes = default_budget(&exam.parts());
        Ok(exam)
    }

    /// Replaces the time budget.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::ZeroTimeBudget` for a zero budget.
    pub fn with_time_budget(mut self, minutes: u32) -> Result<Self, ExamError> {
        if minutes == 0 {
            return Err(ExamError::ZeroTimeBudget);
        }
        self.time_budget_minutes = minutes;
        Ok(self)
    }

    /// Restricts the exam to the selected parts, keeping question order.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptySelection` if no question matches.
    pub fn select(&self, selection: &PartSelection) -> Result<Self, ExamError> {
        if selection.is_all() {
            return Ok(self.clone());
        }
        let questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| selection.includes(q.part()))
            .cloned()
            .collect();
        if questions.is_empty() {
            return Err(ExamError::EmptySelection {
                selection: selection.to_string(),
            });
        }
        Self::new(self.id, self.title.clone(), self.description.clone(), questions)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn time_budget_minutes(&self) -> u32 {
        self.time_budget_minutes
    }

    #[must_use]
    pub fn time_budget_secs(&self) -> u32 {
        self.time_budget_minutes.saturating_mul(60)
    }

    /// Parts present in the exam, in exam order.
    #[must_use]
    pub fn parts(&self) -> Vec<Part> {
        let mut parts: Vec<Part> = self.questions.iter().map(Question::part).collect();
        parts.sort_unstable();
        parts.dedup();
        parts
    }

    #[must_use]
    pub fn summary(&self) -> ExamSummary {
        let mut part_counts = BTreeMap::new();
        for q in &self.questions {
            *part_counts.entry(q.part()).or_insert(0_u32) += 1;
        }
        ExamSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            question_count: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
            part_counts,
        }
    }
}

/// Listing entry for an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: ExamId,
    pub title: String,
    pub description: Option<String>,
    pub question_count: u32,
    pub part_counts: BTreeMap<Part, u32>,
}

//
// ─── AUTHORING ─────────────────────────────────────────────────────────────────
//

/// An exam under construction in the test creator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamDraft {
    pub title: String,
    pub description: Option<String>,
    questions: Vec<QuestionDraft>,
}

impl ExamDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            questions: Vec::new(),
        }
    }

    /// Adds a question after checking it on its own.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the draft would not validate.
    pub fn add_question(&mut self, draft: QuestionDraft) -> Result<usize, QuestionError> {
        draft.clone().validate(QuestionId::new(0))?;
        self.questions.push(draft);
        Ok(self.questions.len() - 1)
    }

    /// Removes the question at `index`, if present.
    pub fn remove_question(&mut self, index: usize) -> Option<QuestionDraft> {
        (index < self.questions.len()).then(|| self.questions.remove(index))
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionDraft] {
        &self.questions
    }

    /// Number of drafted questions per part.
    #[must_use]
    pub fn part_counts(&self) -> BTreeMap<Part, usize> {
        let mut counts = BTreeMap::new();
        for q in &self.questions {
            *counts.entry(q.part).or_insert(0) += 1;
        }
        counts
    }

    /// Validates every question and builds the exam. Question ids are
    /// assigned 1, 2, ... in draft order.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` for an empty title, no questions or an invalid
    /// question.
    pub fn build(self, id: ExamId) -> Result<ExamDefinition, ExamError> {
        if self.title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate(QuestionId::new(index as u64 + 1))
                    .map_err(|source| ExamError::InvalidQuestion { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ExamDefinition::new(id, self.title, self.description, questions)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
