//! Store configuration loaded from `.nestview/config.toml`.
//!
//! A missing file is not an error: every field has a default, so a store
//! created by hand (or by an older version) still works.

use crate::core::error::NestviewError;
use crate::core::store::Store;
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestviewConfig {
    pub schema_version: String,
    pub overlay: OverlayConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Prefix shown before the level number, e.g. `Local View: Level 2`.
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Append one line per toggle to `view.events.jsonl`.
    pub enabled: bool,
}

impl Default for NestviewConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            overlay: OverlayConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            label: "Local View".to_string(),
            enabled: true,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub fn load_config(store: &Store) -> Result<NestviewConfig, NestviewError> {
    let path = store.config_path();
    if !path.exists() {
        return Ok(NestviewConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    let config: NestviewConfig = toml::from_str(&content)?;
    if config.overlay.label.trim().is_empty() {
        return Err(NestviewError::ValidationError(format!(
            "{}: overlay.label must not be empty",
            path.display()
        )));
    }
    Ok(config)
}

pub fn write_config(store: &Store, config: &NestviewConfig) -> Result<(), NestviewError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| NestviewError::ValidationError(e.to_string()))?;
    fs::create_dir_all(&store.root)?;
    fs::write(store.config_path(), rendered)?;
    Ok(())
}
