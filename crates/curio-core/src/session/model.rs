//! Response session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CurioError;

/// Identifier of a survey being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyId(pub i64);

/// Identifier of a response session, assigned by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub i64);

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a positive decimal id. Anything else (signs, blanks, letters) is malformed.
fn parse_positive_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

impl FromStr for SurveyId {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s)
            .map(SurveyId)
            .ok_or_else(|| CurioError::config(format!("malformed survey id '{}'", s)))
    }
}

impl FromStr for ResponseId {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s)
            .map(ResponseId)
            .ok_or_else(|| CurioError::config(format!("malformed response id '{}'", s)))
    }
}

/// Lifecycle status of a response session. Monotonic: `Completed` never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    /// Maps the remote store's status column onto the client's two states.
    ///
    /// The store writes `pending` for fresh rows; anything that is not
    /// `completed` is still open for answers.
    pub fn from_wire(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("completed") {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::InProgress => write!(f, "in_progress"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single answer value, shaped after the question types a survey can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Number(i64),
    Choices(Vec<String>),
    Text(String),
}

impl AnswerValue {
    /// Whether this value counts as an answer for required-question checks.
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Text(text) => !text.trim().is_empty(),
            AnswerValue::Choices(choices) => !choices.is_empty(),
            AnswerValue::Boolean(_) | AnswerValue::Number(_) => true,
        }
    }

    /// Text encoding stored in the remote answers table.
    ///
    /// Choices are JSON arrays; a non-empty single text answer is wrapped as a
    /// one-element array so single and multiple choice rows share one shape.
    pub fn to_stored_text(&self) -> String {
        match self {
            AnswerValue::Boolean(value) => value.to_string(),
            AnswerValue::Number(value) => value.to_string(),
            AnswerValue::Choices(choices) => {
                serde_json::to_string(choices).unwrap_or_else(|_| "[]".to_string())
            }
            AnswerValue::Text(text) if !text.trim().is_empty() => {
                serde_json::to_string(&[text]).unwrap_or_else(|_| text.clone())
            }
            AnswerValue::Text(text) => text.clone(),
        }
    }
}

/// Answers keyed by question identifier, kept in a stable order.
pub type Answers = BTreeMap<String, AnswerValue>;

/// One respondent's attempt at one survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSession {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    pub respondent_identifier: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub answers: Answers,
    pub created_at: Option<DateTime<Utc>>,
}

impl ResponseSession {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Records an answer. Completed sessions are immutable.
    pub fn record_answer(
        &mut self,
        question_id: impl Into<String>,
        value: AnswerValue,
    ) -> Result<(), CurioError> {
        if self.is_completed() {
            return Err(CurioError::Submission(format!(
                "response session {} is already completed",
                self.id
            )));
        }
        self.answers.insert(question_id.into(), value);
        Ok(())
    }
}

/// Confirmation returned by the store after a final submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub response_id: ResponseId,
    pub completion_time: String,
    pub answer_count: usize,
}

/// Formats the elapsed time between creation and completion as `HH:MM:SS`.
///
/// Negative spans (clock skew between client and store) collapse to zero.
pub fn completion_time(created_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> String {
    let total = (completed_at - created_at).num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Returns the first required question without a usable answer.
pub fn first_unanswered<'a>(answers: &Answers, required: &'a [String]) -> Option<&'a str> {
    required
        .iter()
        .find(|question_id| {
            answers
                .get(question_id.as_str())
                .map(|value| !value.is_answered())
                .unwrap_or(true)
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_ids() {
        assert_eq!("42".parse::<ResponseId>().unwrap(), ResponseId(42));
        assert!("".parse::<ResponseId>().is_err());
        assert!("-3".parse::<ResponseId>().is_err());
        assert!("0".parse::<ResponseId>().is_err());
        assert!("12abc".parse::<SurveyId>().is_err());
        assert!(" 12".parse::<SurveyId>().is_err());
    }

    #[test]
    fn test_status_from_wire() {
        assert_eq!(SessionStatus::from_wire("pending"), SessionStatus::InProgress);
        assert_eq!(SessionStatus::from_wire("in_progress"), SessionStatus::InProgress);
        assert_eq!(SessionStatus::from_wire("completed"), SessionStatus::Completed);
        assert_eq!(SessionStatus::from_wire("COMPLETED"), SessionStatus::Completed);
    }

    #[test]
    fn test_stored_text_encoding() {
        assert_eq!(AnswerValue::Boolean(true).to_stored_text(), "true");
        assert_eq!(AnswerValue::Number(9).to_stored_text(), "9");
        assert_eq!(
            AnswerValue::Choices(vec!["A".into(), "B".into()]).to_stored_text(),
            r#"["A","B"]"#
        );
        assert_eq!(AnswerValue::Text("Agree".into()).to_stored_text(), r#"["Agree"]"#);
        assert_eq!(AnswerValue::Text("  ".into()).to_stored_text(), "  ");
    }

    #[test]
    fn test_is_answered() {
        assert!(!AnswerValue::Text("   ".into()).is_answered());
        assert!(!AnswerValue::Choices(vec![]).is_answered());
        assert!(AnswerValue::Boolean(false).is_answered());
        assert!(AnswerValue::Number(0).is_answered());
    }

    #[test]
    fn test_first_unanswered() {
        let mut answers = Answers::new();
        answers.insert("q1".into(), AnswerValue::Text("yes".into()));
        answers.insert("q2".into(), AnswerValue::Text("".into()));
        let required = vec!["q1".to_string(), "q2".to_string(), "q3".to_string()];
        assert_eq!(first_unanswered(&answers, &required), Some("q2"));

        answers.insert("q2".into(), AnswerValue::Number(3));
        assert_eq!(first_unanswered(&answers, &required), Some("q3"));
    }

    #[test]
    fn test_completion_time() {
        let created = Utc.with_ymd_and_hms(2024, 10, 20, 10, 0, 0).unwrap();
        let completed = Utc.with_ymd_and_hms(2024, 10, 20, 11, 2, 5).unwrap();
        assert_eq!(completion_time(created, completed), "01:02:05");
        assert_eq!(completion_time(completed, created), "00:00:00");
    }

    #[test]
    fn test_completed_session_rejects_answers() {
        let mut session = ResponseSession {
            id: ResponseId(1),
            survey_id: SurveyId(2),
            respondent_identifier: None,
            status: SessionStatus::Completed,
            answers: Answers::new(),
            created_at: None,
        };
        assert!(session.record_answer("q1", AnswerValue::Number(1)).is_err());
        session.status = SessionStatus::InProgress;
        assert!(session.record_answer("q1", AnswerValue::Number(1)).is_ok());
        assert_eq!(session.answers.len(), 1);
    }
}
