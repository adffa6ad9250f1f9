//! Response session domain module.
//!
//! - `model`: `ResponseSession`, ids, status and answer values
//! - `repository`: data-access trait for the remote store

mod model;
mod repository;

pub use model::{
    AnswerValue, Answers, ResponseId, ResponseSession, SessionStatus, SubmissionReceipt, SurveyId,
    completion_time, first_unanswered,
};
pub use repository::SurveyResponseRepository;
