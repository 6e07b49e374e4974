use std::{fs, io, path::Path};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::app_constants::ENABLE_DEVTOOLS_ENV;

/// Contents of `app.config.json`. Missing keys mean "disabled".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, deserialize_with = "only_literal_true")]
    pub devtools_enabled: bool,
    /// Keys the launcher does not interpret, kept as read.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn only_literal_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)? == Value::Bool(true))
}

/// Reads the static launcher config. Never fails: anything unreadable is
/// logged and replaced by the empty config.
pub fn load_app_config(path: &Path) -> AppConfig {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return AppConfig::default(),
        Err(error) => {
            log::warn!("Failed to load {}: {}", path.display(), error);
            return AppConfig::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|error| {
        log::warn!("Failed to load {}: {}", path.display(), error);
        AppConfig::default()
    })
}

pub fn resolve_devtools_enabled<F>(config: &AppConfig, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENABLE_DEVTOOLS_ENV).as_deref() == Some("1") || config.devtools_enabled
}
