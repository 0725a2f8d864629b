use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::media::{MediaError, MediaRef};
use crate::model::part::Part;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option letter must be a single ASCII letter, got {0:?}")]
    InvalidLetter(String),

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("a question can have at most 26 options, got {count}")]
    TooManyOptions { count: usize },

    #[error("option {0} has no text")]
    EmptyOptionText(OptionLetter),

    #[error("option {0} appears more than once")]
    DuplicateOption(OptionLetter),

    #[error("correct answer {0} is not one of the options")]
    CorrectNotAmongOptions(OptionLetter),

    #[error("question has no prompt, passage, image or audio")]
    EmptyStem,

    #[error(transparent)]
    Media(#[from] MediaError),
}

//
// ─── OPTION LETTER ─────────────────────────────────────────────────────────────
//

/// Letter identifying an answer option.
///
/// Case is preserved and comparisons are case-sensitive, so `a` does not
/// match a correct answer of `A`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionLetter(char);

impl OptionLetter {
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidLetter` unless `c` is an ASCII letter.
    pub fn new(c: char) -> Result<Self, QuestionError> {
        if c.is_ascii_alphabetic() {
            Ok(Self(c))
        } else {
            Err(QuestionError::InvalidLetter(c.to_string()))
        }
    }

    /// Parses a one-letter string, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidLetter` for anything but a single letter.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::new(c),
            _ => Err(QuestionError::InvalidLetter(trimmed.to_owned())),
        }
    }

    /// Letter for the option at `index` (0 → `A`).
    #[must_use]
    pub fn nth(index: usize) -> Option<Self> {
        let offset = u8::try_from(index).ok().filter(|i| *i < 26)?;
        Some(Self(char::from(b'A' + offset)))
    }

    #[must_use]
    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Debug for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionLetter({})", self.0)
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OptionLetter {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OptionLetter::parse(&value)
    }
}

impl From<OptionLetter> for String {
    fn from(letter: OptionLetter) -> Self {
        letter.0.to_string()
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub letter: OptionLetter,
    pub text: String,
}

/// Unvalidated question as entered by an author.
///
/// Options are given in display order; letters are assigned `A`, `B`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub part: Part,
    pub prompt: Option<String>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub passage: Option<String>,
    pub options: Vec<String>,
    pub correct: String,
    pub explanation: Option<String>,
}

impl QuestionDraft {
    pub fn new(part: Part, prompt: impl Into<String>) -> Self {
        Self {
            part,
            prompt: Some(prompt.into()),
            image: None,
            audio: None,
            passage: None,
            options: Vec::new(),
            correct: String::new(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I, correct: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self.correct = correct.to_owned();
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    #[must_use]
    pub fn with_passage(mut self, passage: impl Into<String>) -> Self {
        self.passage = Some(passage.into());
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Validates the draft and assigns it `id`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the options, the correct letter, the media
    /// references or the stem are invalid.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        if self.options.len() > 26 {
            return Err(QuestionError::TooManyOptions {
                count: self.options.len(),
            });
        }
        let options = self
            .options
            .into_iter()
            .enumerate()
            .filter_map(|(idx, text)| {
                OptionLetter::nth(idx).map(|letter| AnswerOption {
                    letter,
                    text: text.trim().to_owned(),
                })
            })
            .collect();
        let correct = OptionLetter::parse(&self.correct)?;

        Question::from_persisted(
            id,
            self.part,
            self.prompt,
            self.image.as_deref().map(MediaRef::parse).transpose()?,
            self.audio.as_deref().map(MediaRef::parse).transpose()?,
            self.passage,
            options,
            correct,
            self.explanation,
        )
    }
}

/// A single exam question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    part: Part,
    prompt: Option<String>,
    image: Option<MediaRef>,
    audio: Option<MediaRef>,
    passage: Option<String>,
    options: Vec<AnswerOption>,
    correct: OptionLetter,
    explanation: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl Question {
    /// Rehydrate a question from storage, re-checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the options or the stem are invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        part: Part,
        prompt: Option<String>,
        image: Option<MediaRef>,
        audio: Option<MediaRef>,
        passage: Option<String>,
        options: Vec<AnswerOption>,
        correct: OptionLetter,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if option.text.trim().is_empty() {
                return Err(QuestionError::EmptyOptionText(option.letter));
            }
            if !seen.insert(option.letter) {
                return Err(QuestionError::DuplicateOption(option.letter));
            }
        }
        if !seen.contains(&correct) {
            return Err(QuestionError::CorrectNotAmongOptions(correct));
        }

        let prompt = non_blank(prompt);
        let passage = non_blank(passage);
        if prompt.is_none() && passage.is_none() && image.is_none() && audio.is_none() {
            return Err(QuestionError::EmptyStem);
        }

        Ok(Self {
            id,
            part,
            prompt,
            image,
            audio,
            passage,
            options,
            correct,
            explanation: non_blank(explanation),
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn part(&self) -> Part {
        self.part
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&MediaRef> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn audio(&self) -> Option<&MediaRef> {
        self.audio.as_ref()
    }

    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> OptionLetter {
        self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Case-sensitive check of a selected letter.
    #[must_use]
    pub fn is_correct(&self, selected: OptionLetter) -> bool {
        selected == self.correct
    }

    #[must_use]
    pub fn has_option(&self, letter: OptionLetter) -> bool {
        self.options.iter().any(|o| o.letter == letter)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
