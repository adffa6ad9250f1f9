//! Respondent store implementations.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileRespondentStore;
pub use memory_store::InMemoryRespondentStore;
