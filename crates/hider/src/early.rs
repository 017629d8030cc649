//! Early injection - hide stored elements before the page paints
//!
//! Runs at document start, long before a [`PageSession`](crate::page::PageSession)
//! exists. It writes a stylesheet under the initial id; the session's store
//! adopts and renames it later, so nothing flashes in between.

use dom::{parse_selector_list, DomArena, DomError, NodeId};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::migrate::migrate_site;
use crate::storage::Persistence;
use crate::store::render_stylesheet;

/// Write the initial stylesheet for a raw stored site record.
///
/// Returns `None` when the record hides nothing. Selectors that no longer
/// parse are skipped so one bad entry cannot void the whole sheet.
pub fn inject_initial_style(
    arena: &mut DomArena,
    record: Value,
    config: &EngineConfig,
) -> Result<Option<NodeId>> {
    let site = migrate_site(record)?;
    let entries: Vec<_> = site
        .hidden_selectors()
        .into_iter()
        .filter(|(selector, _)| parse_selector_list(selector).is_ok())
        .collect();
    if entries.is_empty() {
        return Ok(None);
    }

    let style = match arena.get_element_by_id(&config.initial_hide_style_id) {
        Some(existing) => existing,
        None => {
            let parent = arena
                .document_element()
                .or_else(|| arena.root_id())
                .ok_or_else(|| DomError::HierarchyRequest("empty document".to_string()))?;
            let style = arena.create_element("style");
            arena.set_attribute(style, "id", &config.initial_hide_style_id)?;
            arena.append_child(parent, style)?;
            style
        }
    };
    arena.set_text_content(style, &render_stylesheet(entries.iter().copied()))?;

    tracing::debug!(rules = entries.len(), "[EarlyInject] Initial hide stylesheet written");
    Ok(Some(style))
}

/// Read `host`'s record and inject it. Failures are logged and leave the
/// page untouched; the session retries from storage anyway.
pub async fn inject_from_storage(
    arena: &mut DomArena,
    storage: &dyn Persistence,
    host: &str,
    config: &EngineConfig,
) -> Option<NodeId> {
    if host.is_empty() {
        return None;
    }
    let record = match storage.read_site(host).await {
        Ok(Some(record)) => record,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(%host, %err, "[EarlyInject] Cannot read site record");
            return None;
        }
    };
    inject_initial_style(arena, record, config).unwrap_or_else(|err| {
        tracing::warn!(%host, %err, "[EarlyInject] Skipping injection");
        None
    })
}
