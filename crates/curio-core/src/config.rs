//! Configuration model.
//!
//! Every section has serde defaults so a partial (or missing) `config.toml`
//! still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct CurioConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub typing: TypingSettings,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Where the remote store and the conversational API live.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// PostgREST root of the remote store, e.g. `https://xyz.supabase.co/rest/v1`.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Anonymous key sent as `apikey` and bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the conversation API (`/api/v1/survey-conversations/...`).
    #[serde(default = "default_conversation_url")]
    pub conversation_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_rest_url() -> String {
    "http://localhost:54321/rest/v1".to_string()
}

fn default_conversation_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            api_key: String::new(),
            conversation_url: default_conversation_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Pace of the typing animation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TypingSettings {
    /// Characters revealed per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between ticks in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_batch_size() -> usize {
    3
}

fn default_tick_interval_ms() -> u64 {
    25
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl TypingSettings {
    /// Batch size, never zero.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Tick interval, never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ConversationSettings {
    /// Respondent replies after which the conversation is complete.
    #[serde(default)]
    pub final_answer_count: Option<usize>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageSettings {
    /// Overrides the default respondent state file location.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}
