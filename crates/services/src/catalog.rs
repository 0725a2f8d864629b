use std::sync::Arc;

use serde::Serialize;
use storage::repository::{ExamRepository, ExamWriter, Storage};
use toeic_core::model::{ExamDefinition, ExamDraft, ExamId, ExamSetup, ExamSummary, Part};

use crate::error::CatalogError;

/// What an attempt with a given setup will look like, before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupPreview {
    pub exam_id: ExamId,
    pub title: String,
    pub parts: Vec<Part>,
    /// Questions this exam actually has in the selected parts.
    pub available_questions: usize,
    /// Question count of a standard exam with the same parts.
    pub expected_questions: u32,
    pub default_minutes: u32,
    pub time_limit_minutes: u32,
    /// Query string that starts this attempt, e.g. `parts=1,2&time=25`.
    pub query: String,
}

/// Lists exams, previews setups and stores authored exams.
#[derive(Clone)]
pub struct CatalogService {
    exams: Arc<dyn ExamRepository>,
    writer: Arc<dyn ExamWriter>,
}

impl CatalogService {
    #[must_use]
    pub fn new(exams: Arc<dyn ExamRepository>, writer: Arc<dyn ExamWriter>) -> Self {
        Self { exams, writer }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(Arc::clone(&storage.exams), Arc::clone(&storage.writer))
    }

    /// Every exam in the bank, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` on provider failures.
    pub async fn list(&self) -> Result<Vec<ExamSummary>, CatalogError> {
        Ok(self.exams.list_exams().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` for an unknown id.
    pub async fn get(&self, exam_id: ExamId) -> Result<ExamDefinition, CatalogError> {
        self.exams
            .get_exam(exam_id)
            .await?
            .ok_or(CatalogError::ExamNotFound(exam_id))
    }

    /// Describes the attempt `setup` would start on `exam_id`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` for an unknown id and
    /// `CatalogError::Exam` if the selection leaves no questions.
    pub async fn preview(
        &self,
        exam_id: ExamId,
        setup: &ExamSetup,
    ) -> Result<SetupPreview, CatalogError> {
        let exam = self.get(exam_id).await?;
        let selected = exam.select(setup.parts())?;
        Ok(SetupPreview {
            exam_id,
            title: selected.title().to_owned(),
            parts: selected.parts(),
            available_questions: selected.len(),
            expected_questions: setup.expected_questions(),
            default_minutes: setup.default_minutes(),
            time_limit_minutes: setup.time_limit_minutes(),
            query: setup.to_query_string(),
        })
    }

    /// Validates `draft` and stores it under `id`, or under the next free id
    /// when `id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Exam` when the draft is invalid and
    /// `CatalogError::Storage` when it cannot be written.
    pub async fn save_draft(
        &self,
        draft: ExamDraft,
        id: Option<ExamId>,
    ) -> Result<ExamDefinition, CatalogError> {
        let id = match id {
            Some(id) => id,
            None => self.next_id().await?,
        };
        let exam = draft.build(id)?;
        self.writer.upsert_exam(&exam).await?;
        tracing::info!(exam_id = %id, questions = exam.len(), "exam saved");
        Ok(exam)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the exam is missing or cannot be
    /// removed.
    pub async fn delete(&self, exam_id: ExamId) -> Result<(), CatalogError> {
        self.writer.delete_exam(exam_id).await?;
        tracing::info!(exam_id = %exam_id, "exam deleted");
        Ok(())
    }

    async fn next_id(&self) -> Result<ExamId, CatalogError> {
        let max = self
            .exams
            .list_exams()
            .await?
            .iter()
            .map(|s| s.id.value())
            .max()
            .unwrap_or(0);
        Ok(ExamId::new(max + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::StorageError;
    use toeic_core::model::{ExamError, PartSelection, QuestionDraft};

    fn catalog() -> CatalogService {
        CatalogService::from_storage(&Storage::sample().unwrap())
    }

    #[tokio::test]
    async fn preview_for_listening_parts() {
        let setup = ExamSetup::from_query(Some("1,2"), None).unwrap();
        let preview = catalog()
            .preview(storage::sample::PRACTICE_TEST_ONE, &setup)
            .await
            .unwrap();
        assert_eq!(preview.parts, vec![Part::Photographs, Part::QuestionResponse]);
        assert_eq!(preview.available_questions, 5);
        assert_eq!(preview.expected_questions, 6 + 25);
        assert_eq!(preview.time_limit_minutes, 25);
        assert_eq!(preview.query, "parts=1,2&time=25");
    }

    #[tokio::test]
    async fn preview_rejects_empty_selection() {
        let setup = ExamSetup::new(PartSelection::from_parts([Part::Photographs]), Some(5))
            .unwrap();
        let err = catalog()
            .preview(storage::sample::READING_DRILL, &setup)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Exam(ExamError::EmptySelection { .. })
        ));
    }

    #[tokio::test]
    async fn save_draft_assigns_next_id() {
        let catalog = catalog();
        let mut draft = ExamDraft::new("My test");
        draft
            .add_question(
                QuestionDraft::new(Part::IncompleteSentences, "She _____ here.")
                    .with_options(["work", "works"], "B"),
            )
            .unwrap();

        let saved = catalog.save_draft(draft, None).await.unwrap();
        assert_eq!(saved.id(), ExamId::new(3));
        assert_eq!(catalog.list().await.unwrap().len(), 3);

        catalog.delete(saved.id()).await.unwrap();
        assert!(matches!(
            catalog.get(saved.id()).await,
            Err(CatalogError::ExamNotFound(_))
        ));
        assert!(matches!(
            catalog.delete(saved.id()).await,
            Err(CatalogError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn save_draft_requires_questions() {
        let err = catalog()
            .save_draft(ExamDraft::new("Empty"), Some(ExamId::new(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Exam(ExamError::NoQuestions)));
    }
}
