#![forbid(unsafe_code)]

pub mod repository;
pub mod sample;
pub mod sqlite;

pub use repository::{ExamRepository, ExamWriter, InMemoryRepository, Storage, StorageError};
