//! Picker State Machine
//!
//! ```text
//!            start                       click (single-select)
//!   Idle ───────────────→ Active ──────────────────────────────→ Idle
//!    ↑                      │ ↺ mousemove / click (multi-select)
//!    └──── stop / Escape ───┘
//! ```
//!
//! Entering `Active` sets the crosshair cursor and registers capture-phase
//! `mousemove`, `click` and `keydown` listeners on the document. Every way
//! out goes through `stop`, which undoes all of it at once.

use dom::{DomArena, EventKind, ListenerId, NodeId};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::label::build_label;
use crate::selector::SelectorResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Idle,
    Active { multi_select: bool },
}

/// Outcome of a click on an eligible element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub node: NodeId,
    pub selector: String,
    pub label: String,
    /// The pick ended the session (single-select)
    pub picker_stopped: bool,
}

pub struct Picker {
    state: PickerState,
    listeners: Vec<ListenerId>,
    hovered: Option<NodeId>,
    root_id: String,
    hover_class: String,
    class_prefix: String,
    label_max_length: usize,
}

impl Picker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: PickerState::Idle,
            listeners: Vec::new(),
            hovered: None,
            root_id: config.root_id.clone(),
            hover_class: config.hover_class.clone(),
            class_prefix: config.class_prefix.clone(),
            label_max_length: config.label_max_length,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PickerState::Active { .. })
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Enter `Active`. Starting again while active only updates multi-select.
    pub fn start(&mut self, arena: &mut DomArena, multi_select: bool) -> Result<()> {
        if self.is_active() {
            self.state = PickerState::Active { multi_select };
            return Ok(());
        }

        if let Some(html) = arena.document_element() {
            arena.set_style(html, "cursor", Some("crosshair"))?;
        }
        self.listeners = [EventKind::MouseMove, EventKind::Click, EventKind::KeyDown]
            .into_iter()
            .map(|kind| arena.add_event_listener(kind, true))
            .collect();
        self.state = PickerState::Active { multi_select };
        tracing::debug!(multi_select, "[Picker] Active");
        Ok(())
    }

    /// Leave `Active`: listeners, cursor and hover highlight all go in one step.
    /// Returns whether the picker was active.
    pub fn stop(&mut self, arena: &mut DomArena) -> Result<bool> {
        for id in self.listeners.drain(..) {
            arena.remove_event_listener(id);
        }
        if let Some(html) = arena.document_element() {
            arena.set_style(html, "cursor", None)?;
        }
        self.clear_hover(arena)?;

        let was_active = self.is_active();
        self.state = PickerState::Idle;
        if was_active {
            tracing::debug!("[Picker] Idle");
        }
        Ok(was_active)
    }

    /// Move the hover highlight to `target`, or drop it if `target` is not pickable
    pub fn on_mouse_move(&mut self, arena: &mut DomArena, target: NodeId) -> Result<()> {
        if !self.is_active() || self.hovered == Some(target) {
            return Ok(());
        }
        self.clear_hover(arena)?;
        if self.is_eligible(arena, target) {
            arena.add_class(target, &self.hover_class)?;
            self.hovered = Some(target);
        }
        Ok(())
    }

    /// Resolve a selector and label for `target`. Ineligible targets yield `None`.
    pub fn on_click(&mut self, arena: &mut DomArena, target: NodeId) -> Result<Option<Pick>> {
        let PickerState::Active { multi_select } = self.state else {
            return Ok(None);
        };
        if !self.is_eligible(arena, target) {
            return Ok(None);
        }

        let selector = SelectorResolver::new(&*arena, &self.class_prefix).resolve(target);
        let label = build_label(arena, target, self.label_max_length)?;

        arena.remove_class(target, &self.hover_class)?;
        self.hovered = None;

        let picker_stopped = !multi_select;
        if picker_stopped {
            self.stop(arena)?;
        }

        tracing::info!(%selector, %label, "[Picker] Picked element");
        Ok(Some(Pick {
            node: target,
            selector,
            label,
            picker_stopped,
        }))
    }

    /// Escape cancels; returns whether the picker stopped
    pub fn on_key_down(&mut self, arena: &mut DomArena, key: &str) -> Result<bool> {
        if key != "Escape" || !self.is_active() {
            return Ok(false);
        }
        self.stop(arena)
    }

    /// Connected elements other than `<html>`, `<body>` and our own root subtree
    pub fn is_eligible(&self, arena: &DomArena, target: NodeId) -> bool {
        let Ok(node) = arena.get(target) else {
            return false;
        };
        if !node.is_element() || !arena.is_connected(target) {
            return false;
        }
        if Some(target) == arena.document_element() || Some(target) == arena.body() {
            return false;
        }
        !arena.inclusive_ancestors(target).any(|id| {
            arena
                .get(id)
                .is_ok_and(|n| n.attr("id") == Some(self.root_id.as_str()))
        })
    }

    fn clear_hover(&mut self, arena: &mut DomArena) -> Result<()> {
        if let Some(node) = self.hovered.take() {
            arena.remove_class(node, &self.hover_class)?;
        }
        Ok(())
    }
}
