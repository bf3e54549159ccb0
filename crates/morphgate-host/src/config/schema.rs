use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use morphgate_core::filter::{FilterMode, FilterRules};

/// Administrator-configured transform settings.
///
/// Every field defaults, so an absent or empty document is a valid, fully
/// permissive configuration. Malformed values inside the filter maps degrade
/// to "no opinion" instead of failing the document; only the outer document
/// structure can fail to parse.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformSettings {
    pub content_type_filter: ContentTypeFilter,
    pub plugins: PluginFilter,
}

impl TransformSettings {
    /// Report suspicious configuration. Never fails: filtering must degrade
    /// permissively, not bring down bootstrap.
    pub fn validate(&self) {
        if self.content_type_filter.uids.is_empty()
            && self.content_type_filter.mode != FilterMode::None
        {
            tracing::warn!(
                mode = self.content_type_filter.mode.as_str(),
                "contentTypeFilter has a mode but no uids, effective mode is none"
            );
        }
    }
}

/// Filter section for first-party content types.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContentTypeFilter {
    pub mode: FilterMode,
    pub uids: FilterRules,
}

/// Filter section for plugin-supplied content types.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PluginFilter {
    #[serde(default = "default_plugin_mode")]
    pub mode: FilterMode,
    #[serde(deserialize_with = "lenient_ids")]
    pub ids: HashMap<String, PluginEntry>,
}

impl Default for PluginFilter {
    fn default() -> Self {
        Self {
            mode: default_plugin_mode(),
            ids: HashMap::new(),
        }
    }
}

fn default_plugin_mode() -> FilterMode {
    FilterMode::Allow
}

/// Per-plugin filter entry: a uid map scoped to that plugin's content types.
#[derive(Debug, Default)]
pub struct PluginEntry {
    pub uids: FilterRules,
}

impl<'de> Deserialize<'de> for PluginEntry {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Default, Deserialize)]
        #[serde(default)]
        struct RawEntry {
            uids: FilterRules,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Entry(RawEntry),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Entry(e) => PluginEntry { uids: e.uids },
            Raw::Other(_) => {
                tracing::debug!("plugin filter entry is not a mapping, treating as empty");
                PluginEntry::default()
            }
        })
    }
}

fn lenient_ids<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<HashMap<String, PluginEntry>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Map(HashMap<String, PluginEntry>),
        Other(IgnoredAny),
    }

    Ok(match Raw::deserialize(de)? {
        Raw::Map(m) => m,
        Raw::Other(_) => {
            tracing::debug!("plugins.ids is not a mapping, treating as empty");
            HashMap::new()
        }
    })
}
