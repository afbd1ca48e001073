use crate::errors::ConfigError;
use scribe_vdom::Markers;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "scribe.config.json";

/// What happens to a render requested while a pass is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReentrancyPolicy {
    /// Run it after the in-flight pass
    #[default]
    Queue,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfig {
    #[serde(flatten)]
    pub markers: Markers,
    pub reentrancy: ReentrancyPolicy,
    /// Trim formatting whitespace from direct text children in text runs
    pub trim_text_runs: bool,
    /// Resolve stable identities through the index before scanning
    pub use_sid_index: bool,
    /// Validate next trees and report unstable shapes
    pub dev_mode: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            markers: Markers::default(),
            reentrancy: ReentrancyPolicy::Queue,
            trim_text_runs: true,
            use_sid_index: true,
            dev_mode: false,
        }
    }
}

impl RendererConfig {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load `scribe.config.json` from `dir`, or defaults if there is none
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-pass options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Leave portals untouched: no portal rendering and no sweep
    pub exclude_portals: bool,
    /// Leave unmatched live nodes in place and report them as retained
    pub suppress_detach: bool,
    /// Rendering nothing keeps the existing live content
    pub preserve_on_clear: bool,
}
