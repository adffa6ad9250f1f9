//! Respondent state store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SurveyId;

/// Client-local persistent key/value storage scoped to one browser profile
/// (or, for the terminal client, one state file).
///
/// Values are plain strings. Several visits may share one scope, so a write
/// must not drop keys another writer set in the meantime.
#[async_trait]
pub trait RespondentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Key holding the respondent identifier for a survey.
pub fn respondent_key(survey_id: SurveyId) -> String {
    format!("survey_{}_respondent", survey_id)
}

/// Key holding the "already completed" flag for a survey.
pub fn completed_key(survey_id: SurveyId) -> String {
    format!("survey_{}_completed", survey_id)
}

/// Reads a boolean-ish flag: `true` and `1` are set, anything else is not.
pub fn is_flag_set(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}
