//! Hide-State Store - one stylesheet for everything hidden on the page
//!
//! Hiding is a CSS rule keyed by selector, never an inline style on a
//! node, so content the page inserts later is hidden with no observer.
//! The rule text is a pure function of the tracked `selector → mode` list
//! and every render replaces it wholesale.

use dom::{parse_selector_list, DomArena, DomError, NodeId, ScrollIntoViewOptions};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::highlight::Highlighter;
use crate::site::HideMode;

/// Group selectors by mode, in order of each mode's first appearance:
/// `sel1,\nsel2 { <declarations> }`, groups separated by newlines.
pub fn render_stylesheet<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, HideMode)>,
{
    let mut groups: Vec<(HideMode, Vec<&'a str>)> = Vec::new();
    for (selector, mode) in entries {
        match groups.iter_mut().find(|(m, _)| *m == mode) {
            Some((_, selectors)) => selectors.push(selector),
            None => groups.push((mode, vec![selector])),
        }
    }

    groups
        .iter()
        .map(|(mode, selectors)| format!("{} {{ {} }}", selectors.join(",\n"), mode.css_declarations()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct HideStateStore {
    style_id: String,
    initial_style_id: String,
    style_node: Option<NodeId>,
    /// Insertion-ordered; re-hiding a selector keeps its position
    selectors: Vec<(String, HideMode)>,
    highlighter: Highlighter,
}

impl HideStateStore {
    pub fn new(config: &EngineConfig, highlighter: Highlighter) -> Self {
        Self {
            style_id: config.hide_style_id.clone(),
            initial_style_id: config.initial_hide_style_id.clone(),
            style_node: None,
            selectors: Vec::new(),
            highlighter,
        }
    }

    /// Take ownership of the page's hide stylesheet.
    ///
    /// Reuses our own element if present, else adopts the early injector's
    /// by renaming it, else creates one under the document element.
    pub fn attach(&mut self, arena: &mut DomArena) -> Result<NodeId> {
        if let Some(node) = self.style_node {
            if arena.is_connected(node) && arena.get(node)?.attr("id") == Some(self.style_id.as_str()) {
                return Ok(node);
            }
        }

        let node = if let Some(own) = arena.get_element_by_id(&self.style_id) {
            own
        } else if let Some(initial) = arena.get_element_by_id(&self.initial_style_id) {
            tracing::debug!("[HideStateStore] Adopting early stylesheet #{}", self.initial_style_id);
            arena.set_attribute(initial, "id", &self.style_id)?;
            initial
        } else {
            let parent = arena
                .document_element()
                .or(arena.root_id())
                .ok_or_else(|| DomError::HierarchyRequest("document has no root".to_string()))?;
            let style = arena.create_element("style");
            arena.set_attribute(style, "id", &self.style_id)?;
            arena.append_child(parent, style)?;
            style
        };

        self.style_node = Some(node);
        Ok(node)
    }

    pub fn style_node(&self) -> Option<NodeId> {
        self.style_node
    }

    pub fn mode(&self, selector: &str) -> Option<HideMode> {
        self.selectors
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, mode)| *mode)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn selectors(&self) -> impl Iterator<Item = (&str, HideMode)> {
        self.selectors.iter().map(|(s, m)| (s.as_str(), *m))
    }

    /// Current rule text, without touching the document
    pub fn stylesheet(&self) -> String {
        render_stylesheet(self.selectors())
    }

    /// Start (or keep) hiding `selector`. Invalid selectors are skipped;
    /// returns whether the selector is now tracked.
    pub fn hide(&mut self, arena: &mut DomArena, selector: &str, mode: HideMode) -> Result<bool> {
        let matched = match arena.query_selector_all(selector) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::debug!(%selector, %err, "[HideStateStore] Skipping invalid selector");
                return Ok(false);
            }
        };
        for node in matched {
            self.highlighter.clear(arena, node)?;
        }

        self.upsert(selector, mode);
        self.render(arena)?;
        Ok(true)
    }

    /// Stop hiding `selector`, then scroll to and flash whatever it matches.
    /// Returns how many elements were revealed.
    pub fn show(&mut self, arena: &mut DomArena, selector: &str) -> Result<usize> {
        self.selectors.retain(|(s, _)| s != selector);
        self.render(arena)?;

        let matched = match arena.query_selector_all(selector) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::debug!(%selector, %err, "[HideStateStore] Nothing to reveal");
                return Ok(0);
            }
        };
        for &node in &matched {
            arena.scroll_into_view(node, ScrollIntoViewOptions::smooth_center())?;
            self.highlighter.flash(arena, node)?;
        }
        Ok(matched.len())
    }

    /// Change the mode of an already hidden selector; untracked selectors are left alone
    pub fn set_mode(&mut self, arena: &mut DomArena, selector: &str, mode: HideMode) -> Result<bool> {
        let Some(entry) = self.selectors.iter_mut().find(|(s, _)| s == selector) else {
            return Ok(false);
        };
        entry.1 = mode;
        self.render(arena)?;
        Ok(true)
    }

    /// Rebuild the map from persisted records with a single render
    pub fn restore<'a, I>(&mut self, arena: &mut DomArena, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, HideMode)>,
    {
        self.selectors.clear();
        for (selector, mode) in entries {
            if parse_selector_list(selector).is_err() {
                tracing::warn!(%selector, "[HideStateStore] Dropping stored selector that no longer parses");
                continue;
            }
            self.upsert(selector, mode);
        }
        self.render(arena)?;
        Ok(self.selectors.len())
    }

    /// Write the stylesheet text, replacing whatever was there
    pub fn render(&mut self, arena: &mut DomArena) -> Result<()> {
        let style = self.attach(arena)?;
        arena.set_text_content(style, &self.stylesheet())?;
        Ok(())
    }

    fn upsert(&mut self, selector: &str, mode: HideMode) {
        match self.selectors.iter_mut().find(|(s, _)| s == selector) {
            Some(entry) => entry.1 = mode,
            None => self.selectors.push((selector.to_string(), mode)),
        }
    }
}

impl Drop for HideStateStore {
    /// Pending reveal timers die with the page
    fn drop(&mut self) {
        self.highlighter.cancel_all();
    }
}
