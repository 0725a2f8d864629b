use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartError {
    #[error("part number must be between 1 and 7, got {0}")]
    OutOfRange(i64),

    #[error("invalid part number: {0:?}")]
    Invalid(String),
}

/// Listening or reading half of the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Listening,
    Reading,
}

impl Section {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Listening => "listening",
            Section::Reading => "reading",
        }
    }
}

/// Which media a part's question format is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub audio: bool,
    pub image: bool,
    pub passage: bool,
}

/// One of the seven fixed TOEIC parts.
///
/// Ordering follows the part number, so sorted collections of parts read in
/// exam order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Part {
    Photographs,
    QuestionResponse,
    Conversations,
    Talks,
    IncompleteSentences,
    TextCompletion,
    ReadingComprehension,
}

impl Part {
    pub const ALL: [Part; 7] = [
        Part::Photographs,
        Part::QuestionResponse,
        Part::Conversations,
        Part::Talks,
        Part::IncompleteSentences,
        Part::TextCompletion,
        Part::ReadingComprehension,
    ];

    /// Parses a 1-based part number.
    ///
    /// # Errors
    ///
    /// Returns `PartError::OutOfRange` for anything outside `1..=7`.
    pub fn from_number(number: u8) -> Result<Self, PartError> {
        match number {
            1 => Ok(Part::Photographs),
            2 => Ok(Part::QuestionResponse),
            3 => Ok(Part::Conversations),
            4 => Ok(Part::Talks),
            5 => Ok(Part::IncompleteSentences),
            6 => Ok(Part::TextCompletion),
            7 => Ok(Part::ReadingComprehension),
            other => Err(PartError::OutOfRange(i64::from(other))),
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Part::Photographs => 1,
            Part::QuestionResponse => 2,
            Part::Conversations => 3,
            Part::Talks => 4,
            Part::IncompleteSentences => 5,
            Part::TextCompletion => 6,
            Part::ReadingComprehension => 7,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Part::Photographs => "Photographs",
            Part::QuestionResponse => "Question-Response",
            Part::Conversations => "Conversations",
            Part::Talks => "Talks",
            Part::IncompleteSentences => "Incomplete Sentences",
            Part::TextCompletion => "Text Completion",
            Part::ReadingComprehension => "Reading Comprehension",
        }
    }

    /// Standard time allotment in minutes.
    #[must_use]
    pub fn standard_minutes(self) -> u32 {
        match self {
            Part::Photographs | Part::TextCompletion => 10,
            Part::QuestionResponse | Part::IncompleteSentences => 15,
            Part::Conversations | Part::Talks | Part::ReadingComprehension => 30,
        }
    }

    /// Number of questions the part has in a full-length exam.
    #[must_use]
    pub fn standard_question_count(self) -> u32 {
        match self {
            Part::Photographs => 6,
            Part::QuestionResponse => 25,
            Part::Conversations => 39,
            Part::Talks | Part::IncompleteSentences => 30,
            Part::TextCompletion => 16,
            Part::ReadingComprehension => 54,
        }
    }

    #[must_use]
    pub fn section(self) -> Section {
        if self.number() <= 4 {
            Section::Listening
        } else {
            Section::Reading
        }
    }

    #[must_use]
    pub fn media_profile(self) -> MediaProfile {
        match self {
            Part::Photographs => MediaProfile {
                audio: true,
                image: true,
                passage: false,
            },
            Part::QuestionResponse | Part::Conversations | Part::Talks => MediaProfile {
                audio: true,
                image: false,
                passage: false,
            },
            Part::IncompleteSentences => MediaProfile {
                audio: false,
                image: false,
                passage: false,
            },
            Part::TextCompletion => MediaProfile {
                audio: false,
                image: false,
                passage: true,
            },
            Part::ReadingComprehension => MediaProfile {
                audio: false,
                image: true,
                passage: true,
            },
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part {}: {}", self.number(), self.name())
    }
}

impl FromStr for Part {
    type Err = PartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let n: i64 = trimmed
            .parse()
            .map_err(|_| PartError::Invalid(trimmed.to_owned()))?;
        u8::try_from(n)
            .map_err(|_| PartError::OutOfRange(n))
            .and_then(Part::from_number)
    }
}

impl TryFrom<u8> for Part {
    type Error = PartError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Part::from_number(value)
    }
}

impl From<Part> for u8 {
    fn from(part: Part) -> Self {
        part.number()
    }
}
