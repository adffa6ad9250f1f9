//! Conversation backend trait.

use super::message::Message;
use crate::error::{CurioError, Result};
use crate::session::ResponseId;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// One arbitrarily sized fragment of an incrementally delivered response.
pub type Chunk = Vec<u8>;

/// Chunked text stream returned by the conversational backend.
///
/// Chunk boundaries carry no meaning; an `Err` item is a mid-stream read failure.
pub type ChunkStream = BoxStream<'static, std::result::Result<Chunk, CurioError>>;

/// Conversational side of the remote store.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Lists the persisted conversation log of a session.
    ///
    /// Implementations should request `order` ordering, but callers must not
    /// rely on it.
    async fn list_messages(&self, session_id: ResponseId) -> Result<Vec<Message>>;

    /// Opens the start-of-session stream (greeting and first question).
    async fn start_conversation(&self, session_id: ResponseId) -> Result<ChunkStream>;

    /// Sends a respondent reply and opens the assistant's answer stream.
    async fn send_message(&self, session_id: ResponseId, text: &str) -> Result<ChunkStream>;
}
