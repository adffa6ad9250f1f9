//! Response session repository trait.
//!
//! Defines the data-access contract the resolver and controller consume from
//! the remote store.

use super::model::{Answers, ResponseId, ResponseSession, SubmissionReceipt, SurveyId};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for response sessions held by the remote store.
///
/// # Implementation Notes
///
/// Implementations own the idempotency of `create` when a respondent
/// identifier is supplied; the client only guarantees it calls `create` at
/// most once per visit.
#[async_trait]
pub trait SurveyResponseRepository: Send + Sync {
    /// Finds the most recent session for a returning respondent.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ResponseSession))`: Latest session for the pair
    /// - `Ok(None)`: The respondent has never started this survey
    /// - `Err(_)`: The store could not be reached
    async fn find_latest_by_respondent(
        &self,
        survey_id: SurveyId,
        respondent_identifier: &str,
    ) -> Result<Option<ResponseSession>>;

    /// Creates a new session, reusing `respondent_identifier` when supplied
    /// or letting the store mint a fresh one.
    async fn create(
        &self,
        survey_id: SurveyId,
        respondent_identifier: Option<&str>,
    ) -> Result<ResponseSession>;

    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ResponseSession))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, id: ResponseId) -> Result<Option<ResponseSession>>;

    /// Stores the final answers and marks the session completed.
    async fn submit_final_answers(
        &self,
        id: ResponseId,
        answers: &Answers,
    ) -> Result<SubmissionReceipt>;
}
