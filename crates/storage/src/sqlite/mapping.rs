use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use toeic_core::model::{
    AnswerOption, ExamId, MediaRef, OptionLetter, Part, Question, QuestionId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn exam_id_to_i64(id: ExamId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("exam_id overflow".into()))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn part_from_i64(v: i64) -> Result<Part, StorageError> {
    let n = u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid part: {v}")))?;
    Part::from_number(n).map_err(ser)
}

pub(crate) fn options_to_json(options: &[AnswerOption]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn options_from_json(raw: &str) -> Result<Vec<AnswerOption>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn media_from_column(raw: Option<String>) -> Result<Option<MediaRef>, StorageError> {
    raw.map(MediaRef::parse).transpose().map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?);
    let part = part_from_i64(row.try_get::<i64, _>("part").map_err(ser)?)?;
    let options = options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let correct = OptionLetter::parse(&row.try_get::<String, _>("correct").map_err(ser)?)
        .map_err(ser)?;

    Question::from_persisted(
        id,
        part,
        row.try_get("prompt").map_err(ser)?,
        media_from_column(row.try_get("image").map_err(ser)?)?,
        media_from_column(row.try_get("audio").map_err(ser)?)?,
        row.try_get("passage").map_err(ser)?,
        options,
        correct,
        row.try_get("explanation").map_err(ser)?,
    )
    .map_err(ser)
}
