//! Infrastructure layer: configuration loading, client-local state stores and
//! the HTTP client for the remote store and conversation API.

pub mod config_service;
pub mod http;
pub mod navigation;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use http::{HttpSurveyBackend, mint_respondent_identifier};
pub use navigation::MemoryNavigation;
pub use paths::CurioPaths;
pub use storage::{FileRespondentStore, InMemoryRespondentStore};
