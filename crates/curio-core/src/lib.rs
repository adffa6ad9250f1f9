//! Domain layer of the Curio respondent client.
//!
//! Holds the response session and transcript models, the data-access traits
//! the application layer consumes, route parsing and the configuration model.

pub mod config;
pub mod conversation;
pub mod error;
pub mod route;
pub mod session;
pub mod state;

// Re-export common error type
pub use error::{CurioError, Result};
