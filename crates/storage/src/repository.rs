use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use toeic_core::model::{ExamDefinition, ExamError, ExamId, ExamSummary};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read-only question bank.
///
/// This is the only storage port the exam runner sees.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Fetch an exam by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing exam is `Ok(None)`.
    async fn get_exam(&self, id: ExamId) -> Result<Option<ExamDefinition>, StorageError>;

    /// List every exam, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StorageError>;
}

/// Write side of the question bank, used by seeding and authoring.
#[async_trait]
pub trait ExamWriter: Send + Sync {
    /// Persist or replace an exam and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &ExamDefinition) -> Result<(), StorageError>;

    /// Remove an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<BTreeMap<ExamId, ExamDefinition>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with the given exams.
    pub fn with_exams(exams: impl IntoIterator<Item = ExamDefinition>) -> Self {
        let map = exams.into_iter().map(|e| (e.id(), e)).collect();
        Self {
            exams: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn get_exam(&self, id: ExamId) -> Result<Option<ExamDefinition>, StorageError> {
        let guard = self
            .exams
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StorageError> {
        let guard = self
            .exams
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().map(ExamDefinition::summary).collect())
    }
}

#[async_trait]
impl ExamWriter for InMemoryRepository {
    async fn upsert_exam(&self, exam: &ExamDefinition) -> Result<(), StorageError> {
        let mut guard = self
            .exams
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let mut guard = self
            .exams
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates the question-bank ports behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub writer: Arc<dyn ExamWriter>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    /// In-memory storage holding the built-in sample exams.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if a sample exam fails validation.
    pub fn sample() -> Result<Self, ExamError> {
        Ok(Self::from_repo(InMemoryRepository::with_exams(
            crate::sample::all()?,
        )))
    }

    fn from_repo(repo: InMemoryRepository) -> Self {
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let writer: Arc<dyn ExamWriter> = Arc::new(repo);
        Self { exams, writer }
    }
}
