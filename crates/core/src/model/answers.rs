use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionId;
use crate::model::question::OptionLetter;

/// Selected letters keyed by question id.
///
/// A question has no entry until it is answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    answers: BTreeMap<QuestionId, OptionLetter>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `letter` for `question`, returning the previous selection.
    pub fn record(&mut self, question: QuestionId, letter: OptionLetter) -> Option<OptionLetter> {
        self.answers.insert(question, letter)
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<OptionLetter> {
        self.answers.get(&question).copied()
    }

    #[must_use]
    pub fn is_answered(&self, question: QuestionId) -> bool {
        self.answers.contains_key(&question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, OptionLetter)> + '_ {
        self.answers.iter().map(|(q, l)| (*q, *l))
    }
}

impl FromIterator<(QuestionId, OptionLetter)> for AnswerSheet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, OptionLetter)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_only_that_question() {
        let a = OptionLetter::new('A').unwrap();
        let b = OptionLetter::new('B').unwrap();
        let mut sheet = AnswerSheet::new();
        assert_eq!(sheet.record(QuestionId::new(1), a), None);
        sheet.record(QuestionId::new(2), a);
        assert_eq!(sheet.record(QuestionId::new(1), b), Some(a));

        assert_eq!(sheet.get(QuestionId::new(1)), Some(b));
        assert_eq!(sheet.get(QuestionId::new(2)), Some(a));
        assert!(!sheet.is_answered(QuestionId::new(3)));
        assert_eq!(sheet.len(), 2);
    }
}
