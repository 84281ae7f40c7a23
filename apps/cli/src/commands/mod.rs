pub mod checkpoint;
pub mod counter;
pub mod index;
pub mod key;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Load a YAML config file as a JSON object map.
pub fn load_config_map(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))?;
    value
        .as_object()
        .cloned()
        .with_context(|| format!("config must be a mapping at the top level: {}", path.display()))
}

/// A section of a config file, or an empty map when the section is absent.
pub fn config_section(config: &Map<String, Value>, section: &str) -> Map<String, Value> {
    config
        .get(section)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
