use serde::Deserialize;

use cursor_api::{CursorConfig, CursorError};

/// Root configuration, parsed from TOML.
///
/// ```toml
/// [cursor]
/// complex_datatype_support = true
/// enable_volume_operations = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cursor: CursorConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CursorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CursorError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CursorError> {
        toml::from_str(toml_str).map_err(|e| CursorError::Config(e.to_string()))
    }
}
