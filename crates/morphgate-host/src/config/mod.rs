//! Settings loader (lenient values, fatal only when the store is unreachable).

pub mod schema;

use std::fs;

use morphgate_core::error::{MorphGateError, Result};

pub use schema::{ContentTypeFilter, PluginEntry, PluginFilter, TransformSettings};

pub fn load_from_file(path: &str) -> Result<TransformSettings> {
    let s = fs::read_to_string(path)
        .map_err(|e| MorphGateError::SettingsUnavailable(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TransformSettings> {
    // An absent document is a valid, fully permissive configuration.
    if s.trim().is_empty() {
        return Ok(TransformSettings::default());
    }
    let settings: TransformSettings = serde_yaml::from_str(s)
        .map_err(|e| MorphGateError::BadSettings(format!("invalid yaml: {e}")))?;
    settings.validate();
    Ok(settings)
}
