//! Shared error types for the services crate.

use thiserror::Error;
use tokio::sync::watch;

use toeic_core::model::{ExamError, ExamId};
use storage::repository::StorageError;

/// Errors emitted by exam sessions and the runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("exam already submitted")]
    AlreadySubmitted,
    #[error("question index {index} out of range (exam has {total} questions)")]
    OutOfRange { index: usize, total: usize },
    #[error("session state is unavailable")]
    StatePoisoned,
    #[error("session updates closed")]
    UpdatesClosed(#[from] watch::error::RecvError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_update_channel_maps_to_its_own_variant() {
        let (tx, mut rx) = watch::channel(0_u8);
        drop(tx);
        let err: SessionError = rx.changed().await.unwrap_err().into();
        assert!(matches!(err, SessionError::UpdatesClosed(_)));
        assert_eq!(err.to_string(), "session updates closed");
    }
}
