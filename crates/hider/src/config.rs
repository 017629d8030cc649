//! Engine and page configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Ids, class names and limits shared by every page instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host element the engine mounts; never pickable
    pub root_id: String,
    /// Stylesheet owned by the hide-state store
    pub hide_style_id: String,
    /// Stylesheet written by the early injector before the engine starts
    pub initial_hide_style_id: String,
    /// Classes with this prefix belong to the engine and never enter selectors
    pub class_prefix: String,
    /// Hover outline while picking
    pub hover_class: String,
    /// Flash applied when an element is revealed again
    pub reveal_class: String,
    pub label_max_length: usize,
    #[serde(with = "millis")]
    pub highlight_duration: Duration,
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_id: "eh-root".to_string(),
            hide_style_id: "eh-hide".to_string(),
            initial_hide_style_id: "eh-initial-hide".to_string(),
            class_prefix: "eh-".to_string(),
            hover_class: "eh-highlight".to_string(),
            reveal_class: "eh-highlight-reveal".to_string(),
            label_max_length: 60,
            highlight_duration: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// One page instance: a fresh id per navigation plus the page URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub id: String,
    pub url: String,
    /// Storage partition key
    pub hostname: String,
}

impl PageConfig {
    /// Pages without a host (`about:blank`, `data:` URLs) get an empty hostname
    pub fn for_url(url: &str) -> Self {
        let hostname = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            id: Uuid::now_v7().to_string(),
            url: url.to_string(),
            hostname,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::for_url("about:blank")
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
