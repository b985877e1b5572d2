use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ROOT_TAG: &str = "manifest";
pub const DEFAULT_CONTAINER: &str = "resources";
pub const DEFAULT_KEY_FIELD: &str = "path";

/// Indentation of saved documents, in spaces.
pub const INDENT_WIDTH: usize = 4;

/// Names the store relies on when reading and editing a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Tag of the single element wrapping the whole document
    #[serde(default = "default_root_tag")]
    pub root_tag: String,
    /// Singleton container holding the named collections
    #[serde(default = "default_container")]
    pub container: String,
    /// Scalar field keying entries within a collection
    #[serde(default = "default_key_field")]
    pub key_field: String,
}

fn default_root_tag() -> String {
    DEFAULT_ROOT_TAG.to_string()
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root_tag: default_root_tag(),
            container: default_container(),
            key_field: default_key_field(),
        }
    }
}

/// Parse a YAML config file into a StoreConfig
pub fn parse_config(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| crate::error::ManifestError::io(path.display().to_string(), e))?;
    parse_config_str(&content)
}

/// Parse a YAML config string into a StoreConfig
pub fn parse_config_str(content: &str) -> Result<StoreConfig> {
    let config: StoreConfig = serde_yaml::from_str(content)?;
    Ok(config)
}
