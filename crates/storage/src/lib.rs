#![forbid(unsafe_code)]

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    HierarchyRepository, InMemoryRepository, NewQuestionRecord, QuestionRepository, SessionEntry,
    SessionLedger, Storage, StorageError,
};
