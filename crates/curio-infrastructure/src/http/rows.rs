//! Row shapes exchanged with the remote store's REST interface.

use chrono::{DateTime, Utc};
use curio_core::conversation::{Message, Sender};
use curio_core::session::{Answers, ResponseId, ResponseSession, SessionStatus, SurveyId};
use serde::{Deserialize, Serialize};

pub(crate) const RESPONSES_TABLE: &str = "cu_survey_responses";
pub(crate) const CONVERSATIONS_TABLE: &str = "cu_survey_response_conversations";
pub(crate) const ANSWERS_TABLE: &str = "cu_survey_answers";

pub(crate) const RESPONSE_COLUMNS: &str = "id,survey_id,status,respondent_identifier,created_at";
pub(crate) const CONVERSATION_COLUMNS: &str =
    "id,survey_response_id,speaker_type,message_text,conversation_order";

/// Status written for freshly created rows.
pub(crate) const STATUS_PENDING: &str = "pending";
pub(crate) const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseRow {
    pub id: i64,
    pub survey_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub respondent_identifier: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ResponseRow> for ResponseSession {
    fn from(row: ResponseRow) -> Self {
        ResponseSession {
            id: ResponseId(row.id),
            survey_id: SurveyId(row.survey_id),
            respondent_identifier: row.respondent_identifier,
            status: row
                .status
                .as_deref()
                .map(SessionStatus::from_wire)
                .unwrap_or(SessionStatus::InProgress),
            answers: Answers::new(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewResponseRow<'a> {
    pub survey_id: i64,
    pub status: &'a str,
    pub respondent_identifier: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompleteResponsePatch<'a> {
    pub status: &'a str,
    pub completion_time: &'a str,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerRow<'a> {
    pub response_id: i64,
    pub question_id: &'a str,
    pub text_answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConversationRow {
    pub id: i64,
    #[allow(dead_code)]
    pub survey_response_id: i64,
    pub speaker_type: String,
    pub message_text: String,
    pub conversation_order: i64,
}

impl From<ConversationRow> for Message {
    fn from(row: ConversationRow) -> Self {
        Message {
            id: row.id.to_string(),
            sender: Sender::from_speaker_type(&row.speaker_type),
            text: row.message_text,
            order: row.conversation_order,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FirstChatRequest {
    pub response_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub response_id: i64,
    pub message: &'a str,
}
