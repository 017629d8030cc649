//! Load-time migration of stored site records
//!
//! Three shapes exist in the wild:
//!
//! ```text
//! v0  [ {selector, preview, timestamp, isHidden?}, ... ]         bare array
//! v1  { elements: [ {selector, label, timestamp, isHidden?} ], lastVisited }
//! v2  { version: 2, elements: [ {.., isHidden, hideMode} ], lastVisited }
//! ```
//!
//! Everything is lifted to v2 exactly once, here. Code past this point sees
//! only `SiteStorage` with every field present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HiderError, Result};
use crate::site::{HideMode, ManagedElement, SiteStorage};

pub const CURRENT_VERSION: u64 = 2;

/// What actually lands in storage
#[derive(Serialize, Deserialize)]
struct StoredSite {
    version: u64,
    #[serde(flatten)]
    site: SiteStorage,
}

/// Lift any known record shape to the current one. `null` is an empty site.
pub fn migrate_site(value: Value) -> Result<SiteStorage> {
    match value {
        Value::Null => Ok(SiteStorage::default()),
        Value::Array(_) => {
            tracing::debug!("[Migrate] Migrating v0 site record");
            Ok(SiteStorage {
                elements: migrate_elements(value)?,
                last_visited: 0,
            })
        }
        Value::Object(mut record) => {
            let version = record.get("version").and_then(Value::as_u64).unwrap_or(1);
            if version == CURRENT_VERSION {
                let stored: StoredSite = serde_json::from_value(Value::Object(record))?;
                return Ok(stored.site);
            }
            if version > CURRENT_VERSION {
                return Err(HiderError::Migration(format!(
                    "record version {version} is newer than {CURRENT_VERSION}"
                )));
            }

            tracing::debug!("[Migrate] Migrating v1 site record");
            let elements = match record.remove("elements") {
                Some(elements) => migrate_elements(elements)?,
                None => Vec::new(),
            };
            let last_visited = record
                .get("lastVisited")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Ok(SiteStorage {
                elements,
                last_visited,
            })
        }
        other => Err(HiderError::Migration(format!(
            "expected an object or array, got {other}"
        ))),
    }
}

/// Bring a list of elements of any version up to date
pub fn migrate_elements(value: Value) -> Result<Vec<ManagedElement>> {
    let Value::Array(items) = value else {
        return Err(HiderError::Migration("elements must be an array".to_string()));
    };
    items.into_iter().map(migrate_element).collect()
}

fn migrate_element(value: Value) -> Result<ManagedElement> {
    let mut element = match value {
        Value::Object(element) => element,
        other => {
            return Err(HiderError::Migration(format!(
                "element must be an object, got {other}"
            )))
        }
    };

    if !element.contains_key("label") {
        let label = element
            .remove("preview")
            .unwrap_or_else(|| Value::String(String::new()));
        element.insert("label".to_string(), label);
    }
    default_field(&mut element, "timestamp", Value::from(0u64));
    default_field(&mut element, "isHidden", Value::Bool(true));

    match element.get("hideMode") {
        None | Some(Value::Null) => {
            element.insert(
                "hideMode".to_string(),
                Value::String(HideMode::default().as_str().to_string()),
            );
        }
        Some(Value::String(mode)) => {
            mode.parse::<HideMode>()?;
        }
        Some(other) => return Err(HiderError::InvalidHideMode(other.to_string())),
    }

    Ok(serde_json::from_value(Value::Object(element))?)
}

fn default_field(element: &mut Map<String, Value>, key: &str, default: Value) {
    match element.get(key) {
        None | Some(Value::Null) => {
            element.insert(key.to_string(), default);
        }
        Some(_) => {}
    }
}

/// Current-version value for writing
pub fn to_stored(site: &SiteStorage) -> Result<Value> {
    Ok(serde_json::to_value(StoredSite {
        version: CURRENT_VERSION,
        site: site.clone(),
    })?)
}
