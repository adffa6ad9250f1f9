//! Client-local persisted state.

mod repository;

pub use repository::{RespondentStore, completed_key, is_flag_set, respondent_key};
