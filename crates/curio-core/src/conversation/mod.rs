//! Conversation domain module: messages, transcript and backend contract.

mod backend;
mod message;
mod transcript;

pub use backend::{Chunk, ChunkStream, ConversationBackend};
pub use message::{Message, Sender};
pub use transcript::Transcript;
