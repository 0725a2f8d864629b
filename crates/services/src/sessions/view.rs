//! Presentation helpers for the exam screen and the results screen.
//!
//! Nothing here localizes; callers decide how to lay the values out.

use serde::Serialize;
use toeic_core::model::{AnswerOption, MediaProfile, OptionLetter, Part};

use super::session::ExamSession;

/// Remaining time below which the exam header shows a warning.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 5 * 60;

/// `HH:MM:SS`, as shown in the exam header.
#[must_use]
pub fn format_clock(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `1h 2m 3s`, `2m 3s` or `3s`, as shown on the results screen.
#[must_use]
pub fn format_elapsed(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[must_use]
pub fn is_low_time(remaining_secs: u32) -> bool {
    remaining_secs < LOW_TIME_THRESHOLD_SECS
}

/// The current question as the exam screen needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub part: Part,
    pub part_label: String,
    pub media: MediaProfile,
    pub prompt: Option<String>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub passage: Option<String>,
    pub options: Vec<AnswerOption>,
    pub selected: Option<OptionLetter>,
    pub answered: usize,
    pub remaining_secs: u32,
    pub low_time: bool,
}

impl QuestionView {
    #[must_use]
    pub fn from_session(session: &ExamSession) -> Option<Self> {
        let question = session.current_question()?;
        Some(Self {
            number: session.position() + 1,
            total: session.total(),
            part: question.part(),
            part_label: question.part().to_string(),
            media: question.part().media_profile(),
            prompt: question.prompt().map(ToOwned::to_owned),
            image: question.image().map(|m| m.as_str().to_owned()),
            audio: question.audio().map(|m| m.as_str().to_owned()),
            passage: question.passage().map(ToOwned::to_owned),
            options: question.options().to_vec(),
            selected: session.current_answer(),
            answered: session.answers().len(),
            remaining_secs: session.remaining_secs(),
            low_time: is_low_time(session.remaining_secs()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toeic_core::model::{ExamDefinition, ExamId, QuestionDraft, QuestionId};
    use toeic_core::time::fixed_now;

    #[test]
    fn clock_pads_every_field() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(7_200), "02:00:00");
        assert_eq!(format_clock(3_725), "01:02:05");
    }

    #[test]
    fn elapsed_drops_leading_zero_units() {
        assert_eq!(format_elapsed(3), "3s");
        assert_eq!(format_elapsed(123), "2m 3s");
        assert_eq!(format_elapsed(3_723), "1h 2m 3s");
        assert_eq!(format_elapsed(3_600), "1h 0m 0s");
    }

    #[test]
    fn low_time_is_strictly_below_five_minutes() {
        assert!(is_low_time(299));
        assert!(!is_low_time(300));
    }

    #[test]
    fn question_view_reflects_position_and_answer() {
        let q = QuestionDraft::new(Part::Photographs, "Describe the picture.")
            .with_image("images/p1.png")
            .with_options(["One", "Two"], "B")
            .validate(QuestionId::new(1))
            .unwrap();
        let exam = ExamDefinition::new(ExamId::new(1), "View", None, vec![q]).unwrap();
        let mut session = ExamSession::new(exam, 120, fixed_now());
        session
            .select_answer(OptionLetter::new('A').unwrap())
            .unwrap();

        let view = QuestionView::from_session(&session).unwrap();
        assert_eq!((view.number, view.total), (1, 1));
        assert_eq!(view.part_label, "Part 1: Photographs");
        assert!(view.media.image);
        assert_eq!(view.image.as_deref(), Some("images/p1.png"));
        assert_eq!(view.selected, OptionLetter::new('A').ok());
        assert!(view.low_time);
    }
}
