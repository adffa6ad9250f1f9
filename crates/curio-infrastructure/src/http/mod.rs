//! HTTP data-access client.
//!
//! Talks to two services:
//! - the remote store's PostgREST interface for sessions, answers and the
//!   persisted conversation log;
//! - the conversation API, whose `first_chat` and `chat` endpoints answer with
//!   `text/event-stream` bodies exposed as raw chunk streams.

mod rows;

use async_trait::async_trait;
use chrono::Utc;
use curio_core::config::BackendSettings;
use curio_core::conversation::{ChunkStream, ConversationBackend, Message};
use curio_core::error::{CurioError, Result};
use curio_core::session::{
    Answers, ResponseId, ResponseSession, SubmissionReceipt, SurveyId, SurveyResponseRepository,
    completion_time,
};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use rows::{
    ANSWERS_TABLE, AnswerRow, CONVERSATION_COLUMNS, CONVERSATIONS_TABLE, ChatRequest,
    CompleteResponsePatch, ConversationRow, FirstChatRequest, NewResponseRow, RESPONSE_COLUMNS,
    RESPONSES_TABLE, ResponseRow, STATUS_COMPLETED, STATUS_PENDING,
};

const FIRST_CHAT_PATH: &str = "api/v1/survey-conversations/first_chat";
const CHAT_PATH: &str = "api/v1/survey-conversations/chat";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Mints a respondent identifier when the caller has none.
pub fn mint_respondent_identifier() -> String {
    format!("anonymous_{}", Uuid::new_v4().simple())
}

/// Remote store and conversation API client.
#[derive(Clone)]
pub struct HttpSurveyBackend {
    client: Client,
    rest_url: String,
    conversation_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpSurveyBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        // No client-wide timeout: it would also cut long-running streams.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(map_transport_error)?;

        Ok(Self {
            client,
            rest_url: trim_base(&settings.rest_url),
            conversation_url: trim_base(&settings.conversation_url),
            api_key: settings.api_key.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs.max(1)),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn conversation_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.conversation_url, path)
    }

    /// Adds store authentication and the per-request timeout.
    fn rest(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.request_timeout);
        if self.api_key.is_empty() {
            builder
        } else {
            builder
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>> {
        let response = self
            .rest(builder)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| CurioError::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            })
    }

    async fn open_stream<B: serde::Serialize + Sync>(
        &self,
        url: String,
        body: &B,
    ) -> Result<ChunkStream> {
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;

        tracing::debug!(%url, "conversation stream opened");

        let stream = response.bytes_stream().map(|item| {
            item.map(|bytes| bytes.to_vec())
                .map_err(|err| CurioError::stream(err.to_string()))
        });
        Ok(stream.boxed())
    }
}

#[async_trait]
impl SurveyResponseRepository for HttpSurveyBackend {
    async fn find_latest_by_respondent(
        &self,
        survey_id: SurveyId,
        respondent_identifier: &str,
    ) -> Result<Option<ResponseSession>> {
        let builder = self.client.get(self.table_url(RESPONSES_TABLE)).query(&[
            ("select", RESPONSE_COLUMNS.to_string()),
            ("survey_id", format!("eq.{}", survey_id)),
            ("respondent_identifier", format!("eq.{}", respondent_identifier)),
            ("order", "created_at.desc".to_string()),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<ResponseRow> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().next().map(ResponseSession::from))
    }

    async fn create(
        &self,
        survey_id: SurveyId,
        respondent_identifier: Option<&str>,
    ) -> Result<ResponseSession> {
        let minted;
        let respondent_identifier = match respondent_identifier {
            Some(identifier) => identifier,
            None => {
                minted = mint_respondent_identifier();
                minted.as_str()
            }
        };

        let body = [NewResponseRow {
            survey_id: survey_id.0,
            status: STATUS_PENDING,
            respondent_identifier,
        }];
        let builder = self
            .client
            .post(self.table_url(RESPONSES_TABLE))
            .header("Prefer", "return=representation")
            .query(&[("select", RESPONSE_COLUMNS)])
            .json(&body);

        let rows: Vec<ResponseRow> = self.fetch_rows(builder).await?;
        let session = rows
            .into_iter()
            .next()
            .map(ResponseSession::from)
            .ok_or_else(|| CurioError::internal("store returned no row for the new session"))?;

        tracing::info!(
            survey_id = %survey_id,
            session_id = %session.id,
            "created response session"
        );
        Ok(session)
    }

    async fn find_by_id(&self, id: ResponseId) -> Result<Option<ResponseSession>> {
        let builder = self.client.get(self.table_url(RESPONSES_TABLE)).query(&[
            ("select", RESPONSE_COLUMNS.to_string()),
            ("id", format!("eq.{}", id)),
        ]);
        let rows: Vec<ResponseRow> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().next().map(ResponseSession::from))
    }

    async fn submit_final_answers(
        &self,
        id: ResponseId,
        answers: &Answers,
    ) -> Result<SubmissionReceipt> {
        let mut session = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| CurioError::not_found("response_session", id.to_string()))?;
        for (question_id, value) in answers {
            session.record_answer(question_id.clone(), value.clone())?;
        }

        let completed_at = Utc::now();
        let elapsed = completion_time(session.created_at.unwrap_or(completed_at), completed_at);

        // Answers go in before the status flips, so a failed write leaves the
        // session open for a retry. Rows from an earlier attempt are replaced.
        if !session.answers.is_empty() {
            let response = self
                .rest(
                    self.client
                        .delete(self.table_url(ANSWERS_TABLE))
                        .query(&[("response_id", format!("eq.{}", id))]),
                )
                .send()
                .await
                .map_err(map_transport_error)?;
            ensure_success(response).await?;

            let rows: Vec<AnswerRow<'_>> = session
                .answers
                .iter()
                .map(|(question_id, value)| AnswerRow {
                    response_id: id.0,
                    question_id,
                    text_answer: value.to_stored_text(),
                })
                .collect();
            let response = self
                .rest(self.client.post(self.table_url(ANSWERS_TABLE)).json(&rows))
                .send()
                .await
                .map_err(map_transport_error)?;
            ensure_success(response).await?;
        }

        let patch = CompleteResponsePatch {
            status: STATUS_COMPLETED,
            completion_time: &elapsed,
            updated_at: completed_at.to_rfc3339(),
        };
        let response = self
            .rest(
                self.client
                    .patch(self.table_url(RESPONSES_TABLE))
                    .query(&[("id", format!("eq.{}", id))])
                    .json(&patch),
            )
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;

        tracing::info!(session_id = %id, completion_time = %elapsed, "submitted final answers");

        Ok(SubmissionReceipt {
            response_id: id,
            completion_time: elapsed,
            answer_count: session.answers.len(),
        })
    }
}

#[async_trait]
impl ConversationBackend for HttpSurveyBackend {
    async fn list_messages(&self, session_id: ResponseId) -> Result<Vec<Message>> {
        let builder = self.client.get(self.table_url(CONVERSATIONS_TABLE)).query(&[
            ("select", CONVERSATION_COLUMNS.to_string()),
            ("survey_response_id", format!("eq.{}", session_id)),
            ("order", "conversation_order.asc".to_string()),
        ]);
        let rows: Vec<ConversationRow> = self.fetch_rows(builder).await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn start_conversation(&self, session_id: ResponseId) -> Result<ChunkStream> {
        let body = FirstChatRequest {
            response_id: session_id.0,
        };
        self.open_stream(self.conversation_endpoint(FIRST_CHAT_PATH), &body)
            .await
    }

    async fn send_message(&self, session_id: ResponseId, text: &str) -> Result<ChunkStream> {
        let body = ChatRequest {
            response_id: session_id.0,
            message: text,
        };
        self.open_stream(self.conversation_endpoint(CHAT_PATH), &body)
            .await
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn map_transport_error(err: reqwest::Error) -> CurioError {
    if err.is_timeout() {
        CurioError::network(format!("request timed out: {}", err))
    } else if err.is_connect() {
        CurioError::network(format!("connection failed: {}", err))
    } else if err.is_decode() {
        CurioError::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    } else {
        CurioError::network(err.to_string())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    Err(map_http_error(status, body))
}

/// PostgREST errors carry a JSON `message`; anything else is passed through.
fn map_http_error(status: StatusCode, body: String) -> CurioError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.message)
        .unwrap_or(body);
    CurioError::http(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_identifier_shape() {
        let identifier = mint_respondent_identifier();
        assert!(identifier.starts_with("anonymous_"));
        assert_eq!(identifier.len(), "anonymous_".len() + 32);
        assert_ne!(identifier, mint_respondent_identifier());
    }

    #[test]
    fn test_endpoints_trim_trailing_slash() {
        let settings = BackendSettings {
            rest_url: "https://store.example/rest/v1/".to_string(),
            conversation_url: "https://chat.example/".to_string(),
            ..BackendSettings::default()
        };
        let backend = HttpSurveyBackend::new(&settings).unwrap();
        assert_eq!(
            backend.table_url(RESPONSES_TABLE),
            "https://store.example/rest/v1/cu_survey_responses"
        );
        assert_eq!(
            backend.conversation_endpoint(CHAT_PATH),
            "https://chat.example/api/v1/survey-conversations/chat"
        );
    }

    #[test]
    fn test_map_http_error_extracts_message() {
        let err = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"invalid input","code":"22P02"}"#.to_string(),
        );
        assert_eq!(err, CurioError::http(400, "invalid input"));

        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err, CurioError::http(502, "upstream down"));
    }
}
