//! Application layer for Curio.
//!
//! Turns the domain contracts into one respondent visit: the session resolver,
//! the stream decoder and typing renderer, and the conversation controller
//! that ties them together.

pub mod controller;
pub mod resolver;
pub mod stream;

pub use controller::{ConversationController, ConversationEvent, ConversationState, StateEvent};
pub use resolver::{Resolution, ResolvedSession, SessionResolver, SessionSource};
pub use stream::{ExchangeOutcome, StreamDecoder, StreamState, TypingRenderer, run_exchange};
