mod answers;
mod exam;
mod ids;
mod media;
mod part;
mod question;
mod result;
mod selection;

pub use answers::AnswerSheet;
pub use exam::{ExamDefinition, ExamDraft, ExamError, ExamSummary};
pub use ids::{ExamId, ParseIdError, QuestionId, SessionId};
pub use media::{MediaError, MediaLocation, MediaRef};
pub use part::{MediaProfile, Part, PartError, Section};
pub use question::{AnswerOption, OptionLetter, Question, QuestionDraft, QuestionError};
pub use result::{
    AnswerDetail, AnswerStatus, ExamResult, PartBreakdown, ScoreCard, SectionBreakdown,
    SubmissionReason, Tally,
};
pub use selection::{
    ExamSetup, FULL_EXAM_MINUTES, FULL_EXAM_QUESTIONS, PartSelection, SelectionError,
    TIME_OVERRIDE_RANGE,
};
