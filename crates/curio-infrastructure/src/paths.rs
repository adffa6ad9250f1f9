//! Path resolution for Curio configuration and client-local state.
//!
//! ```text
//! ~/.config/curio/             # Config directory
//! ├── config.toml              # Backend, typing and conversation settings
//! └── respondent_state.json    # Respondent identifiers and completion flags
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "curio";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "respondent_state.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for curio_core::CurioError {
    fn from(err: PathError) -> Self {
        curio_core::CurioError::config(err.to_string())
    }
}

/// Unified path management for Curio.
pub struct CurioPaths;

impl CurioPaths {
    /// Returns the Curio configuration directory (e.g. `~/.config/curio/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Returns the path to the respondent state file.
    pub fn state_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(STATE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_config_dir() {
        if let (Ok(dir), Ok(config), Ok(state)) = (
            CurioPaths::config_dir(),
            CurioPaths::config_file(),
            CurioPaths::state_file(),
        ) {
            assert!(dir.ends_with(APP_DIR));
            assert_eq!(config.parent(), Some(dir.as_path()));
            assert_eq!(state.file_name().and_then(|n| n.to_str()), Some(STATE_FILE));
        }
    }
}
