use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

use crate::model::part::{Part, PartError};

/// Default time budget of a full exam, in minutes.
pub const FULL_EXAM_MINUTES: u32 = 120;

/// Number of questions in a full exam.
pub const FULL_EXAM_QUESTIONS: u32 = 200;

/// Accepted range for a custom time limit, in minutes.
pub const TIME_OVERRIDE_RANGE: std::ops::RangeInclusive<u32> = 1..=300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error(transparent)]
    Part(#[from] PartError),

    #[error("invalid time value: {0:?}")]
    InvalidTime(String),

    #[error("time limit must be between 1 and 300 minutes, got {0}")]
    TimeOutOfRange(u32),

    #[error("unknown query parameter: {0}")]
    UnknownParameter(String),
}

//
// ─── PART SELECTION ────────────────────────────────────────────────────────────
//

/// Which parts an attempt covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartSelection {
    #[default]
    All,
    Parts(BTreeSet<Part>),
}

impl PartSelection {
    /// Parses the `parts` query value.
    ///
    /// Absent, blank or `all` select every part; otherwise a comma-separated
    /// list of part numbers. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::Part` for a token that is not a part number.
    pub fn parse(raw: Option<&str>) -> Result<Self, SelectionError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::All);
        };
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let parts = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::parse::<Part>)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if parts.is_empty() {
            return Ok(Self::All);
        }
        Ok(Self::Parts(parts))
    }

    pub fn from_parts(parts: impl IntoIterator<Item = Part>) -> Self {
        let parts: BTreeSet<Part> = parts.into_iter().collect();
        if parts.is_empty() {
            Self::All
        } else {
            Self::Parts(parts)
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn includes(&self, part: Part) -> bool {
        match self {
            Self::All => true,
            Self::Parts(parts) => parts.contains(&part),
        }
    }

    /// Selected parts in exam order.
    #[must_use]
    pub fn parts(&self) -> Vec<Part> {
        match self {
            Self::All => Part::ALL.to_vec(),
            Self::Parts(parts) => parts.iter().copied().collect(),
        }
    }
}

impl fmt::Display for PartSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Parts(parts) => {
                let joined = parts
                    .iter()
                    .map(|p| p.number().to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                f.write_str(&joined)
            }
        }
    }
}

//
// ─── EXAM SETUP ────────────────────────────────────────────────────────────────
//

/// Configuration of one attempt: which parts, and how long.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExamSetup {
    parts: PartSelection,
    time_override: Option<u32>,
}

impl ExamSetup {
    /// # Errors
    ///
    /// Returns `SelectionError::TimeOutOfRange` if the override is outside
    /// `1..=300` minutes.
    pub fn new(parts: PartSelection, time_override: Option<u32>) -> Result<Self, SelectionError> {
        if let Some(minutes) = time_override {
            if !TIME_OVERRIDE_RANGE.contains(&minutes) {
                return Err(SelectionError::TimeOutOfRange(minutes));
            }
        }
        Ok(Self {
            parts,
            time_override,
        })
    }

    #[must_use]
    pub fn full_exam() -> Self {
        Self::default()
    }

    /// Builds a setup from the raw `parts` and `time` query values.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` if either value is malformed.
    pub fn from_query(parts: Option<&str>, time: Option<&str>) -> Result<Self, SelectionError> {
        let parts = PartSelection::parse(parts)?;
        let time_override = match time.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| SelectionError::InvalidTime(raw.to_owned()))?,
            ),
        };
        Self::new(parts, time_override)
    }

    /// Parses a query string such as `parts=1,2&time=25` (leading `?` allowed).
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` for malformed values or unknown keys.
    pub fn from_query_str(query: &str) -> Result<Self, SelectionError> {
        let mut parts = None;
        let mut time = None;
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "parts" => parts = Some(value.into_owned()),
                "time" => time = Some(value.into_owned()),
                other => return Err(SelectionError::UnknownParameter(other.to_owned())),
            }
        }
        Self::from_query(parts.as_deref(), time.as_deref())
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        format!("parts={}&time={}", self.parts, self.time_limit_minutes())
    }

    #[must_use]
    pub fn parts(&self) -> &PartSelection {
        &self.parts
    }

    #[must_use]
    pub fn time_override(&self) -> Option<u32> {
        self.time_override
    }

    /// Minutes allotted when no custom time is given.
    #[must_use]
    pub fn default_minutes(&self) -> u32 {
        match &self.parts {
            PartSelection::All => FULL_EXAM_MINUTES,
            PartSelection::Parts(parts) => parts.iter().map(|p| p.standard_minutes()).sum(),
        }
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_override.unwrap_or_else(|| self.default_minutes())
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes().saturating_mul(60)
    }

    /// Question count of a full-length exam with this selection.
    #[must_use]
    pub fn expected_questions(&self) -> u32 {
        match &self.parts {
            PartSelection::All => FULL_EXAM_QUESTIONS,
            PartSelection::Parts(parts) => {
                parts.iter().map(|p| p.standard_question_count()).sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_blank_and_all_mean_every_part() {
        assert_eq!(PartSelection::parse(None).unwrap(), PartSelection::All);
        assert_eq!(PartSelection::parse(Some("  ")).unwrap(), PartSelection::All);
        assert_eq!(PartSelection::parse(Some("ALL")).unwrap(), PartSelection::All);
    }

    #[test]
    fn parses_part_list_and_collapses_duplicates() {
        let sel = PartSelection::parse(Some("3, 1,3")).unwrap();
        assert_eq!(sel.parts(), vec![Part::Photographs, Part::Conversations]);
        assert_eq!(sel.to_string(), "1,3");
    }

    #[test]
    fn rejects_unknown_part() {
        let err = PartSelection::parse(Some("1,9")).unwrap_err();
        assert_eq!(err, SelectionError::Part(PartError::OutOfRange(9)));
    }

    #[test]
    fn default_time_sums_selected_parts() {
        let setup = ExamSetup::from_query(Some("1,2"), None).unwrap();
        assert_eq!(setup.default_minutes(), 25);
        assert_eq!(setup.time_limit_minutes(), 25);
        assert_eq!(setup.time_limit_secs(), 1500);
        assert_eq!(setup.expected_questions(), 31);
    }

    #[test]
    fn full_exam_uses_fixed_default() {
        let setup = ExamSetup::full_exam();
        assert_eq!(setup.time_limit_minutes(), 120);
        assert_eq!(setup.expected_questions(), 200);
    }

    #[test]
    fn override_wins_and_is_bounded() {
        let setup = ExamSetup::from_query(Some("5"), Some("40")).unwrap();
        assert_eq!(setup.default_minutes(), 15);
        assert_eq!(setup.time_limit_minutes(), 40);

        assert_eq!(
            ExamSetup::from_query(None, Some("0")).unwrap_err(),
            SelectionError::TimeOutOfRange(0)
        );
        assert_eq!(
            ExamSetup::from_query(None, Some("301")).unwrap_err(),
            SelectionError::TimeOutOfRange(301)
        );
        assert!(matches!(
            ExamSetup::from_query(None, Some("soon")),
            Err(SelectionError::InvalidTime(_))
        ));
    }

    #[test]
    fn query_string_round_trip() {
        let setup = ExamSetup::from_query_str("?parts=1%2C2&time=30").unwrap();
        assert_eq!(setup.to_query_string(), "parts=1,2&time=30");

        let full = ExamSetup::from_query_str("parts=all").unwrap();
        assert_eq!(full.to_query_string(), "parts=all&time=120");

        assert_eq!(
            ExamSetup::from_query_str("parts=1&mode=fast").unwrap_err(),
            SelectionError::UnknownParameter("mode".into())
        );
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let spaced = ExamSetup::from_query_str("parts=1%2C%202").unwrap();
        assert_eq!(spaced.parts().parts(), vec![Part::Photographs, Part::QuestionResponse]);

        let escaped_digit = ExamSetup::from_query_str("parts=%31,2").unwrap();
        assert_eq!(escaped_digit, spaced);

        let timed = ExamSetup::from_query_str("parts=1,2&time=%32%35").unwrap();
        assert_eq!(timed.time_override(), Some(25));

        let plus_space = ExamSetup::from_query_str("?parts=5,+6&time=+40").unwrap();
        assert_eq!(plus_space.to_query_string(), "parts=5,6&time=40");

        let encoded_key = ExamSetup::from_query_str("parts=1&ti%6De=10").unwrap();
        assert_eq!(encoded_key.time_override(), Some(10));
    }
}
