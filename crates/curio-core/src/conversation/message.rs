//! Conversation message types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person answering the survey.
    Respondent,
    /// The conversational backend.
    Assistant,
}

impl Sender {
    /// Maps the store's `speaker_type` column; only `user` rows are the respondent.
    pub fn from_speaker_type(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("user") {
            Sender::Respondent
        } else {
            Sender::Assistant
        }
    }
}

/// A single message in a transcript.
///
/// `order` is the monotonic sequence number used as the only sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub order: i64,
}

impl Message {
    /// Creates a message that exists only on this client so far.
    pub fn local(sender: Sender, text: impl Into<String>, order: i64) -> Self {
        Self {
            id: format!("local-{}", Uuid::new_v4().simple()),
            sender,
            text: text.into(),
            order,
        }
    }
}
