//! Page Session - everything one page instance owns
//!
//! A session is created per navigation. It mounts the engine's root host,
//! rebuilds hide state from storage, then serves commands and user input
//! one at a time (see [`crate::channel::serve`]).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dom::{DomArena, DomError, EventKind, NodeId};

use crate::config::{EngineConfig, PageConfig};
use crate::error::{HiderError, Result};
use crate::events::EventBus;
use crate::highlight::{Highlighter, SharedDocument};
use crate::picker::{Pick, Picker};
use crate::protocol::{Command, PageEvent, Response};
use crate::site::{HideMode, ManagedElement, SiteStorage};
use crate::storage::Persistence;
use crate::store::HideStateStore;

/// Raw user input, as the page's capture listeners would see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    MouseMove { target: NodeId },
    Click { target: NodeId },
    KeyDown { key: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The page's own handling of the event was suppressed
    pub default_prevented: bool,
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct PageSession {
    config: Arc<EngineConfig>,
    page: PageConfig,
    doc: SharedDocument,
    store: HideStateStore,
    picker: Picker,
    storage: Arc<dyn Persistence>,
    events: EventBus,
    /// Fixed when the session starts; written with every save
    last_visited: u64,
}

impl PageSession {
    pub fn new(
        doc: SharedDocument,
        page: PageConfig,
        config: EngineConfig,
        storage: Arc<dyn Persistence>,
    ) -> Self {
        let highlighter = Highlighter::new(
            doc.clone(),
            config.reveal_class.clone(),
            config.highlight_duration,
        );
        Self {
            store: HideStateStore::new(&config, highlighter),
            picker: Picker::new(&config),
            config: Arc::new(config),
            page,
            doc,
            storage,
            events: EventBus::new(),
            last_visited: now_millis(),
        }
    }

    pub fn page(&self) -> &PageConfig {
        &self.page
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &HideStateStore {
        &self.store
    }

    pub fn is_picker_active(&self) -> bool {
        self.picker.is_active()
    }

    /// Mount into the page and restore what this site had hidden.
    ///
    /// Fails with `AlreadyInjected` if another instance owns the page.
    /// Storage problems are logged and leave the page unhidden.
    pub async fn initialize(&mut self) -> Result<()> {
        {
            let mut arena = self.doc.write().await;
            if arena.get_element_by_id(&self.config.root_id).is_some() {
                return Err(HiderError::AlreadyInjected);
            }
            self.mount_root(&mut arena)?;
            self.store.attach(&mut arena)?;
        }

        let mut site = self.load_site().await;
        if !site.is_empty() {
            site.last_visited = self.last_visited;
            if let Err(err) = self.storage.save_site(&self.page.hostname, &site).await {
                tracing::warn!(host = %self.page.hostname, %err, "[PageSession] Failed to record visit");
            }
        }

        let mut arena = self.doc.write().await;
        let restored = self.store.restore(&mut arena, site.hidden_selectors())?;
        tracing::info!(
            host = %self.page.hostname,
            page = %self.page.id,
            restored,
            "[PageSession] Page session initialized"
        );
        Ok(())
    }

    pub async fn handle(&mut self, command: Command) -> Response {
        tracing::debug!(?command, "[PageSession] Handling command");
        let mut arena = self.doc.write().await;

        let outcome = match command {
            Command::StartPicker { multi_select } => self.picker.start(&mut arena, multi_select),
            Command::StopPicker => self.picker.stop(&mut arena).map(drop),
            Command::ShowElement { selector } => self.store.show(&mut arena, &selector).map(drop),
            Command::HideElement { selector, mode } => {
                self.store.hide(&mut arena, &selector, mode).map(drop)
            }
            Command::SetHideMode { selector, mode } => {
                self.store.set_mode(&mut arena, &selector, mode).map(drop)
            }
            Command::GetStatus => return self.status(),
        };

        if let Err(err) = outcome {
            tracing::warn!(%err, "[PageSession] Command failed");
        }
        Response::Ack
    }

    /// Route input to the picker when its listeners are registered
    pub async fn dispatch(&mut self, event: InputEvent) -> DispatchOutcome {
        match event {
            InputEvent::MouseMove { target } => {
                let mut arena = self.doc.write().await;
                if arena.has_listener(EventKind::MouseMove, true) {
                    if let Err(err) = self.picker.on_mouse_move(&mut arena, target) {
                        tracing::debug!(%err, "[PageSession] Hover update failed");
                    }
                }
                DispatchOutcome::default()
            }
            InputEvent::Click { target } => self.on_click(target).await,
            InputEvent::KeyDown { key } => {
                let stopped = {
                    let mut arena = self.doc.write().await;
                    if !arena.has_listener(EventKind::KeyDown, true) {
                        return DispatchOutcome::default();
                    }
                    self.picker.on_key_down(&mut arena, &key).unwrap_or_else(|err| {
                        tracing::warn!(%err, "[PageSession] Picker cleanup failed");
                        false
                    })
                };
                if stopped {
                    self.publish_status();
                }
                DispatchOutcome::default()
            }
        }
    }

    async fn on_click(&mut self, target: NodeId) -> DispatchOutcome {
        let prevented = DispatchOutcome {
            default_prevented: true,
        };

        let pick = {
            let mut arena = self.doc.write().await;
            if !arena.has_listener(EventKind::Click, true) {
                return DispatchOutcome::default();
            }
            let pick = match self.picker.on_click(&mut arena, target) {
                Ok(Some(pick)) => pick,
                Ok(None) => return prevented,
                Err(err) => {
                    tracing::warn!(%err, "[PageSession] Pick failed");
                    return prevented;
                }
            };
            if let Err(err) = self.store.hide(&mut arena, &pick.selector, HideMode::Hidden) {
                tracing::warn!(%err, "[PageSession] Failed to hide picked element");
            }
            pick
        };

        self.persist_pick(&pick).await;
        self.events.publish(PageEvent::ElementHidden {
            selector: pick.selector,
            label: pick.label,
        });
        if pick.picker_stopped {
            self.publish_status();
        }
        prevented
    }

    /// Append the pick to the site record. Visual state is already updated
    /// and stays that way if this fails.
    async fn persist_pick(&self, pick: &Pick) {
        let host = &self.page.hostname;
        if host.is_empty() {
            return;
        }

        let mut site = match self.storage.load_site(host).await {
            Ok(site) => site,
            Err(err) => {
                tracing::warn!(%host, %err, "[PageSession] Cannot load site record, pick not persisted");
                return;
            }
        };
        if !site.add(ManagedElement::picked(&pick.selector, &pick.label, now_millis())) {
            tracing::debug!(selector = %pick.selector, "[PageSession] Selector already managed");
            return;
        }
        site.last_visited = self.last_visited;
        if let Err(err) = self.storage.save_site(host, &site).await {
            tracing::warn!(%host, %err, "[PageSession] Failed to persist pick");
        }
    }

    async fn load_site(&self) -> SiteStorage {
        if self.page.hostname.is_empty() {
            return SiteStorage::default();
        }
        match self.storage.load_site(&self.page.hostname).await {
            Ok(site) => site,
            Err(err) => {
                tracing::warn!(host = %self.page.hostname, %err, "[PageSession] Ignoring unreadable site record");
                SiteStorage::default()
            }
        }
    }

    fn mount_root(&self, arena: &mut DomArena) -> Result<NodeId> {
        let html = arena
            .document_element()
            .ok_or_else(|| DomError::HierarchyRequest("page has no document element".to_string()))?;
        let root = arena.create_element("div");
        arena.set_attribute(root, "id", &self.config.root_id)?;
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("width", "0"),
            ("height", "0"),
            ("overflow", "visible"),
            ("z-index", "2147483647"),
            ("pointer-events", "none"),
        ] {
            arena.set_style(root, property, Some(value))?;
        }
        arena.append_child(html, root)?;
        Ok(root)
    }

    fn status(&self) -> Response {
        Response::Status {
            is_picker_active: self.picker.is_active(),
            hostname: self.page.hostname.clone(),
        }
    }

    fn publish_status(&self) {
        self.events.publish(PageEvent::Status {
            is_picker_active: self.picker.is_active(),
            hostname: self.page.hostname.clone(),
        });
    }
}
