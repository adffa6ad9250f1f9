//! Configuration loading.
//!
//! Reads `config.toml` and applies environment overrides on top.

use crate::paths::CurioPaths;
use curio_core::config::CurioConfig;
use curio_core::error::Result;
use std::path::{Path, PathBuf};

/// Overrides `backend.rest_url`.
pub const ENV_REST_URL: &str = "CURIO_REST_URL";
/// Overrides `backend.api_key`.
pub const ENV_API_KEY: &str = "CURIO_API_KEY";
/// Overrides `backend.conversation_url`.
pub const ENV_API_BASE_URL: &str = "CURIO_API_BASE_URL";

/// Loads [`CurioConfig`] from a TOML file.
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Uses the default location (`~/.config/curio/config.toml`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: CurioPaths::config_file()?,
        })
    }

    /// Uses a custom path (for testing or `--config`).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file, falling back to defaults when it does not exist, then
    /// applies environment overrides.
    pub fn load(&self) -> Result<CurioConfig> {
        let mut config = self.load_file()?;
        apply_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(&self) -> Result<CurioConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "config file missing, using defaults");
            return Ok(CurioConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(CurioConfig::default());
        }

        let config = toml::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), "loaded config");
        Ok(config)
    }
}

/// Applies environment overrides. Empty values are ignored.
pub fn apply_overrides<F>(config: &mut CurioConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(rest_url) = non_empty(ENV_REST_URL) {
        config.backend.rest_url = rest_url;
    }
    if let Some(api_key) = non_empty(ENV_API_KEY) {
        config.backend.api_key = api_key;
    }
    if let Some(conversation_url) = non_empty(ENV_API_BASE_URL) {
        config.backend.conversation_url = conversation_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));
        let config = service.load_file().unwrap();
        assert_eq!(config, CurioConfig::default());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [backend]
            rest_url = "https://store.example/rest/v1"
            api_key = "anon"

            [typing]
            batch_size = 5
            tick_interval_ms = 10
            "#,
        )
        .unwrap();

        let config = ConfigService::with_path(path).load_file().unwrap();
        assert_eq!(config.backend.rest_url, "https://store.example/rest/v1");
        assert_eq!(config.backend.api_key, "anon");
        assert_eq!(config.typing.batch_size, 5);
        assert_eq!(config.typing.tick_interval_ms, 10);
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[typing\nbatch_size = ").unwrap();
        let err = ConfigService::with_path(path).load_file().unwrap_err();
        assert!(matches!(err, curio_core::CurioError::Serialization { .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_BASE_URL, "https://chat.example"),
            (ENV_API_KEY, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = CurioConfig::default();
        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.conversation_url, "https://chat.example");
        assert_eq!(config.backend.api_key, "");
    }
}
