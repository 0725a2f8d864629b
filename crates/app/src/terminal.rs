//! Line-oriented terminal front-end for listing, previewing and taking exams.

use std::fmt::Write as _;

use services::sessions::view::{format_clock, format_elapsed};
use services::{QuestionView, RunningExam, SessionError, SetupPreview};
use tokio::io::{AsyncBufReadExt, BufReader};
use toeic_core::model::{
    AnswerOption, AnswerStatus, ExamResult, ExamSummary, OptionLetter, SubmissionReason,
};

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// One line typed during an exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(OptionLetter),
    Next,
    Previous,
    /// 1-based question number.
    GoTo(usize),
    Submit,
    Quit,
    Help,
    Empty,
    Unknown(String),
}

/// Interprets a typed line against the options of the current question.
///
/// A single letter matching an option (ignoring case) selects that option's
/// own letter; any other single letter is recorded as typed.
pub fn parse_input(line: &str, options: &[AnswerOption]) -> Input {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Input::Empty;
    };

    match head {
        "next" | "n" => return Input::Next,
        "prev" | "p" => return Input::Previous,
        "submit" | "s" => return Input::Submit,
        "quit" | "q" => return Input::Quit,
        "help" | "h" | "?" => return Input::Help,
        "go" | "g" => {
            return words
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map_or_else(|| Input::Unknown(line.to_string()), Input::GoTo);
        }
        _ => {}
    }

    let Ok(typed) = OptionLetter::parse(head) else {
        return Input::Unknown(line.to_string());
    };
    let matched = options
        .iter()
        .map(|o| o.letter)
        .find(|l| l.as_char().eq_ignore_ascii_case(&typed.as_char()));
    Input::Answer(matched.unwrap_or(typed))
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

pub fn render_summaries(summaries: &[ExamSummary]) -> String {
    let mut out = String::new();
    if summaries.is_empty() {
        out.push_str("No exams available.\n");
        return out;
    }
    for s in summaries {
        let parts: Vec<String> = s
            .part_counts
            .iter()
            .map(|(part, count)| format!("P{}x{count}", part.number()))
            .collect();
        let _ = writeln!(
            out,
            "[{}] {} ({} questions: {})",
            s.id,
            s.title,
            s.question_count,
            parts.join(" ")
        );
        if let Some(desc) = &s.description {
            let _ = writeln!(out, "      {desc}");
        }
    }
    out
}

pub fn render_preview(preview: &SetupPreview) -> String {
    let parts: Vec<String> = preview.parts.iter().map(ToString::to_string).collect();
    let mut out = String::new();
    let _ = writeln!(out, "{}", preview.title);
    let _ = writeln!(out, "  Parts:      {}", parts.join(", "));
    let _ = writeln!(
        out,
        "  Questions:  {} in this exam ({} in a standard exam)",
        preview.available_questions, preview.expected_questions
    );
    let _ = writeln!(
        out,
        "  Time limit: {} min (default {} min)",
        preview.time_limit_minutes, preview.default_minutes
    );
    let _ = writeln!(out, "  Start with: take {} --query \"{}\"", preview.exam_id, preview.query);
    out
}

pub fn render_question(view: &QuestionView) -> String {
    let mut out = String::new();
    let warning = if view.low_time { "  (less than 5 minutes left)" } else { "" };
    let _ = writeln!(
        out,
        "\n{}  |  Question {} of {}  |  answered {}  |  {}{warning}",
        view.part_label,
        view.number,
        view.total,
        view.answered,
        format_clock(view.remaining_secs)
    );
    if let Some(audio) = &view.audio {
        let _ = writeln!(out, "  [audio] {audio}");
    }
    if let Some(image) = &view.image {
        let _ = writeln!(out, "  [image] {image}");
    }
    if let Some(passage) = &view.passage {
        let _ = writeln!(out, "  {passage}");
    }
    if let Some(prompt) = &view.prompt {
        let _ = writeln!(out, "  {prompt}");
    }
    for option in &view.options {
        let marker = if view.selected == Some(option.letter) { '*' } else { ' ' };
        let _ = writeln!(out, "   {marker}({}) {}", option.letter, option.text);
    }
    if let Some(selected) = view.selected {
        if !view.options.iter().any(|o| o.letter == selected) {
            let _ = writeln!(out, "   *({selected}) (not an option)");
        }
    }
    out
}

pub fn render_result(result: &ExamResult) -> String {
    let score = &result.score;
    let mut out = String::new();
    let _ = writeln!(out, "\n=== {} ===", result.exam_title);
    let _ = writeln!(
        out,
        "Score: {}/{} ({}%)  correct {}  incorrect {}  unanswered {}",
        score.tally.correct,
        score.total,
        score.percentage,
        score.tally.correct,
        score.tally.incorrect,
        score.tally.unanswered
    );
    let _ = writeln!(
        out,
        "Time: {} of {}{}",
        format_elapsed(result.elapsed_secs),
        format_elapsed(result.time_limit_secs),
        match result.reason {
            SubmissionReason::TimeExpired => "  (time expired)",
            SubmissionReason::Manual => "",
        }
    );
    for section in &score.sections {
        let _ = writeln!(
            out,
            "{:<10} {}/{} ({}%)",
            section.section.as_str(),
            section.tally.correct,
            section.total,
            section.percentage
        );
    }
    for part in &score.parts {
        let _ = writeln!(
            out,
            "  Part {} {:<22} {}/{} ({}%)",
            part.part.number(),
            part.name,
            part.tally.correct,
            part.total,
            part.percentage
        );
    }
    let _ = writeln!(out, "Answers:");
    for answer in &score.answers {
        let selected = answer
            .selected
            .map_or_else(|| "-".to_string(), |l| l.to_string());
        let status = match answer.status {
            AnswerStatus::Correct => "correct",
            AnswerStatus::Incorrect => "incorrect",
            AnswerStatus::Unanswered => "unanswered",
        };
        let _ = writeln!(
            out,
            "  {:>3}. yours {selected}  answer {}  {status}",
            answer.number, answer.correct
        );
        if let Some(explanation) = &answer.explanation {
            let _ = writeln!(out, "       {explanation}");
        }
    }
    out
}

const HELP: &str = "Type a letter to answer, n/p for next/previous, g <number> to jump, \
                    s to submit, q to quit without submitting.";

//
// ─── EXAM LOOP ─────────────────────────────────────────────────────────────────
//

/// Drives an attempt from stdin until it is submitted (by the user or the
/// timer) or abandoned. Returns `None` when the user quits.
///
/// # Errors
///
/// Returns session errors other than navigation mistakes, and stdin failures.
pub async fn take_exam(
    running: RunningExam,
) -> Result<Option<ExamResult>, Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{HELP}");

    loop {
        let view = running.with_session(QuestionView::from_session)?;
        if let Some(view) = &view {
            print!("{}", render_question(view));
        }
        let options = view.map(|v| v.options).unwrap_or_default();

        let line = tokio::select! {
            submitted = running.wait_until_submitted() => {
                eprintln!("Time is up. Your answers were submitted.");
                return Ok(Some(submitted?));
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            // stdin closed: hand in what we have
            return Ok(Some(finish(&running)?));
        };

        let outcome = match parse_input(&line, &options) {
            Input::Answer(letter) => running.select_answer(letter).map(|_| ()),
            Input::Next => running.next().map(|moved| {
                if !moved {
                    eprintln!("Already at the last question.");
                }
            }),
            Input::Previous => running.previous().map(|moved| {
                if !moved {
                    eprintln!("Already at the first question.");
                }
            }),
            Input::GoTo(number) => running.go_to(number - 1),
            Input::Submit => return Ok(Some(finish(&running)?)),
            Input::Quit => {
                running.close();
                return Ok(None);
            }
            Input::Help => {
                eprintln!("{HELP}");
                Ok(())
            }
            Input::Empty => Ok(()),
            Input::Unknown(raw) => {
                eprintln!("Unrecognised input: {raw}");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => {}
            Err(SessionError::OutOfRange { total, .. }) => {
                eprintln!("Pick a question between 1 and {total}.");
            }
            Err(SessionError::AlreadySubmitted) => {
                return Ok(running.result()?);
            }
            Err(other) => return Err(other.into()),
        }
    }
}

fn finish(running: &RunningExam) -> Result<ExamResult, SessionError> {
    match running.submit() {
        Err(SessionError::AlreadySubmitted) => running
            .result()?
            .ok_or(SessionError::AlreadySubmitted),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::ExamSession;
    use toeic_core::model::{ExamDefinition, ExamId, Part, QuestionDraft, QuestionId};
    use toeic_core::time::fixed_now;

    fn options() -> Vec<AnswerOption> {
        ["A", "B", "C", "D"]
            .iter()
            .map(|l| AnswerOption {
                letter: OptionLetter::parse(l).unwrap(),
                text: format!("Option {l}"),
            })
            .collect()
    }

    fn letter(c: char) -> OptionLetter {
        OptionLetter::new(c).unwrap()
    }

    #[test]
    fn parses_commands_before_letters() {
        let opts = options();
        assert_eq!(parse_input("n", &opts), Input::Next);
        assert_eq!(parse_input(" prev ", &opts), Input::Previous);
        assert_eq!(parse_input("g 12", &opts), Input::GoTo(12));
        assert_eq!(parse_input("submit", &opts), Input::Submit);
        assert_eq!(parse_input("", &opts), Input::Empty);
        assert_eq!(parse_input("g 0", &opts), Input::Unknown("g 0".into()));
    }

    #[test]
    fn letters_snap_to_option_case() {
        let opts = options();
        assert_eq!(parse_input("b", &opts), Input::Answer(letter('B')));
        assert_eq!(parse_input("C", &opts), Input::Answer(letter('C')));
        assert_eq!(parse_input("X", &opts), Input::Answer(letter('X')));
        assert_eq!(parse_input("42", &opts), Input::Unknown("42".into()));
    }

    #[test]
    fn question_render_marks_selection() {
        let q = QuestionDraft::new(Part::Talks, "Who is speaking?")
            .with_audio("audio/talk.mp3")
            .with_options(["A chef", "A pilot"], "B")
            .validate(QuestionId::new(1))
            .unwrap();
        let exam = ExamDefinition::new(ExamId::new(1), "Render", None, vec![q]).unwrap();
        let mut session = ExamSession::new(exam, 3_600, fixed_now());
        session.select_answer(letter('B')).unwrap();

        let text = render_question(&QuestionView::from_session(&session).unwrap());
        assert!(text.contains("Part 4: Talks"));
        assert!(text.contains("01:00:00"));
        assert!(text.contains("[audio] audio/talk.mp3"));
        assert!(text.contains("*(B) A pilot"));
        assert!(text.contains(" (A) A chef"));
    }

    #[test]
    fn result_render_lists_sections_and_answers() {
        let exam = storage::sample::reading_drill().unwrap();
        let mut session = ExamSession::new(exam, 60, fixed_now());
        session.select_answer(letter('A')).unwrap();
        let result = session.submit(fixed_now()).unwrap().clone();

        let text = render_result(&result);
        assert!(text.contains("Score: 1/4 (25%)"));
        assert!(text.contains("reading"));
        assert!(text.contains("yours -"));
        assert!(text.contains("Time: 0s of 1m 0s"));
    }
}
