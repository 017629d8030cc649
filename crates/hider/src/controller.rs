//! Site Controller - the panel side of one hostname
//!
//! Holds the panel's copy of the site record. Every mutation is mirrored
//! to the page with a quiet command first, then saved; a storage failure
//! is returned but never rolls back what the page already shows. A page
//! that is gone or slow simply misses the update and rebuilds from storage
//! on its next load.

use std::sync::Arc;

use crate::channel::PageHandle;
use crate::error::Result;
use crate::page::now_millis;
use crate::protocol::{Command, PageEvent, Response};
use crate::site::{HideMode, ManagedElement, SiteStorage};
use crate::storage::Persistence;

pub struct SiteController {
    host: String,
    storage: Arc<dyn Persistence>,
    page: PageHandle,
    site: SiteStorage,
}

impl SiteController {
    pub async fn load(
        host: impl Into<String>,
        storage: Arc<dyn Persistence>,
        page: PageHandle,
    ) -> Result<Self> {
        let host = host.into();
        let site = storage.load_site(&host).await?;
        tracing::debug!(%host, elements = site.len(), "[SiteController] Loaded");
        Ok(Self {
            host,
            storage,
            page,
            site,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn elements(&self) -> &[ManagedElement] {
        &self.site.elements
    }

    pub fn site(&self) -> &SiteStorage {
        &self.site
    }

    /// Re-read the record, discarding local state
    pub async fn reload(&mut self) -> Result<()> {
        self.site = self.storage.load_site(&self.host).await?;
        Ok(())
    }

    /// Whether the page's picker is running; `None` if the page did not answer
    pub async fn status(&self) -> Option<bool> {
        match self.page.request(Command::GetStatus).await {
            Ok(Response::Status {
                is_picker_active, ..
            }) => Some(is_picker_active),
            Ok(Response::Ack) => None,
            Err(err) => {
                tracing::debug!(%err, "[SiteController] No status from page");
                None
            }
        }
    }

    pub async fn start_picker(&self) {
        let settings = self.storage.load_settings().await.unwrap_or_else(|err| {
            tracing::warn!(%err, "[SiteController] Using default settings");
            Default::default()
        });
        self.page
            .send_quiet(Command::StartPicker {
                multi_select: settings.multi_select,
            })
            .await;
    }

    pub async fn stop_picker(&self) {
        self.page.send_quiet(Command::StopPicker).await;
    }

    /// Flip one element; returns its new hidden state
    pub async fn toggle(&mut self, selector: &str) -> Result<Option<bool>> {
        let Some(hidden) = self.site.toggle(selector) else {
            return Ok(None);
        };
        self.sync_visibility(selector).await;
        self.save().await?;
        Ok(Some(hidden))
    }

    /// Hide everything, or show everything if it is all hidden already
    pub async fn toggle_all(&mut self) -> Result<Option<bool>> {
        let Some(hidden) = self.site.toggle_all() else {
            return Ok(None);
        };
        let selectors: Vec<String> = self.site.elements.iter().map(|e| e.selector.clone()).collect();
        for selector in &selectors {
            self.sync_visibility(selector).await;
        }
        self.save().await?;
        Ok(Some(hidden))
    }

    /// Stop managing `selector`, revealing it first if it is hidden
    pub async fn delete(&mut self, selector: &str) -> Result<bool> {
        let Some(removed) = self.site.remove(selector) else {
            return Ok(false);
        };
        if removed.is_hidden {
            self.page
                .send_quiet(Command::ShowElement {
                    selector: removed.selector,
                })
                .await;
        }
        self.save().await?;
        Ok(true)
    }

    pub async fn rename(&mut self, selector: &str, label: &str) -> Result<bool> {
        if !self.site.rename(selector, label.trim()) {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// Change the mode; the page only needs telling when the element is hidden
    pub async fn set_hide_mode(&mut self, selector: &str, mode: HideMode) -> Result<bool> {
        if !self.site.set_hide_mode(selector, mode) {
            return Ok(false);
        }
        if self.site.get(selector).is_some_and(|e| e.is_hidden) {
            self.page
                .send_quiet(Command::SetHideMode {
                    selector: selector.to_string(),
                    mode,
                })
                .await;
        }
        self.save().await?;
        Ok(true)
    }

    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<bool> {
        if !self.site.move_element(from, to) {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// Forget this site entirely and reveal whatever was hidden
    pub async fn clear_site(&mut self) -> Result<()> {
        let cleared = std::mem::take(&mut self.site.elements);
        for element in cleared.into_iter().filter(|e| e.is_hidden) {
            self.page
                .send_quiet(Command::ShowElement {
                    selector: element.selector,
                })
                .await;
        }
        self.storage.remove_site(&self.host).await?;
        tracing::info!(host = %self.host, "[SiteController] Site cleared");
        Ok(())
    }

    /// Merge an exported list and hide the newly added elements
    pub async fn import_json(&mut self, json: &str) -> Result<usize> {
        let before = self.site.len();
        let added = self.site.import_json(json)?;
        if added == 0 {
            return Ok(0);
        }

        let fresh: Vec<(String, HideMode)> = self.site.elements[before..]
            .iter()
            .filter(|e| e.is_hidden)
            .map(|e| (e.selector.clone(), e.hide_mode))
            .collect();
        for (selector, mode) in fresh {
            self.page
                .send_quiet(Command::HideElement { selector, mode })
                .await;
        }
        self.save().await?;
        Ok(added)
    }

    pub fn export_json(&self) -> Result<String> {
        self.site.export_json()
    }

    /// Mirror a pick the page already persisted. Returns whether the list changed.
    pub fn element_hidden(&mut self, event: &PageEvent) -> bool {
        let PageEvent::ElementHidden { selector, label } = event else {
            return false;
        };
        self.site
            .add(ManagedElement::picked(selector, label, now_millis()))
    }

    async fn save(&self) -> Result<()> {
        self.storage.save_site(&self.host, &self.site).await
    }

    async fn sync_visibility(&self, selector: &str) {
        let Some(element) = self.site.get(selector) else {
            return;
        };
        let command = if element.is_hidden {
            Command::HideElement {
                selector: element.selector.clone(),
                mode: element.hide_mode,
            }
        } else {
            Command::ShowElement {
                selector: element.selector.clone(),
            }
        };
        self.page.send_quiet(command).await;
    }
}

/// Every stored site, sorted by hostname. Unreadable records are skipped.
pub async fn list_sites(storage: &dyn Persistence) -> Result<Vec<(String, SiteStorage)>> {
    let mut sites = Vec::new();
    for host in storage.site_hosts().await? {
        match storage.load_site(&host).await {
            Ok(site) => sites.push((host, site)),
            Err(err) => tracing::warn!(%host, %err, "[SiteController] Skipping unreadable site"),
        }
    }
    sites.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sites)
}

pub async fn delete_site(storage: &dyn Persistence, host: &str) -> Result<()> {
    storage.remove_site(host).await
}

/// Remove every site record; settings are kept. Returns how many were removed.
pub async fn clear_all_sites(storage: &dyn Persistence) -> Result<usize> {
    let hosts = storage.site_hosts().await?;
    for host in &hosts {
        storage.remove_site(host).await?;
    }
    tracing::info!(count = hosts.len(), "[SiteController] All sites cleared");
    Ok(hosts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{page_channel, Inbound};
    use crate::storage::{MemoryStorage, Settings};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    const HOST: &str = "shop.example.com";

    /// A page that acknowledges everything and remembers what it was told
    fn recording_page() -> (PageHandle, JoinHandle<Vec<Command>>) {
        let (handle, mut rx) = page_channel(16, Duration::from_secs(5));
        let task = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(inbound) = rx.recv().await {
                if let Inbound::Command { command, reply } = inbound {
                    let _ = reply.send(Response::Ack);
                    seen.push(command);
                }
            }
            seen
        });
        (handle, task)
    }

    async fn seeded(selectors: &[&str]) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        let mut site = SiteStorage::default();
        for (i, selector) in selectors.iter().enumerate() {
            site.add(ManagedElement::picked(*selector, format!("item {i}"), i as u64));
        }
        storage.save_site(HOST, &site).await.unwrap();
        storage
    }

    async fn finish(controller: SiteController, page: JoinHandle<Vec<Command>>) -> Vec<Command> {
        drop(controller);
        page.await.unwrap()
    }

    fn hide(selector: &str) -> Command {
        Command::HideElement {
            selector: selector.into(),
            mode: HideMode::Hidden,
        }
    }

    fn show(selector: &str) -> Command {
        Command::ShowElement {
            selector: selector.into(),
        }
    }

    #[tokio::test]
    async fn test_toggle_saves_and_mirrors() {
        let storage = seeded(&["#a", "#b"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        assert_eq!(controller.toggle("#a").await.unwrap(), Some(false));
        assert_eq!(controller.toggle("#a").await.unwrap(), Some(true));
        assert_eq!(controller.toggle("#missing").await.unwrap(), None);

        let stored = storage.load_site(HOST).await.unwrap();
        assert!(stored.get("#a").unwrap().is_hidden);
        assert_eq!(finish(controller, recorded).await, vec![show("#a"), hide("#a")]);
    }

    #[tokio::test]
    async fn test_toggle_all() {
        let storage = seeded(&["#a", "#b"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        controller.toggle("#b").await.unwrap();
        // Not all hidden, so everything gets hidden
        assert_eq!(controller.toggle_all().await.unwrap(), Some(true));
        assert_eq!(controller.toggle_all().await.unwrap(), Some(false));

        assert_eq!(
            finish(controller, recorded).await,
            vec![
                show("#b"),
                hide("#a"),
                hide("#b"),
                show("#a"),
                show("#b")
            ]
        );
        assert!(storage
            .load_site(HOST)
            .await
            .unwrap()
            .elements
            .iter()
            .all(|e| !e.is_hidden));
    }

    #[tokio::test]
    async fn test_delete_reveals_hidden_only() {
        let storage = seeded(&["#a", "#b"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        controller.toggle("#b").await.unwrap();
        assert!(controller.delete("#a").await.unwrap());
        assert!(controller.delete("#b").await.unwrap());
        assert!(!controller.delete("#b").await.unwrap());

        // Empty list removes the record
        assert_eq!(storage.read_site(HOST).await.unwrap(), None);
        assert_eq!(finish(controller, recorded).await, vec![show("#b"), show("#a")]);
    }

    #[tokio::test]
    async fn test_set_hide_mode_only_tells_page_when_hidden() {
        let storage = seeded(&["#a", "#b"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        controller.toggle("#b").await.unwrap();
        assert!(controller.set_hide_mode("#a", HideMode::Invisible).await.unwrap());
        assert!(controller.set_hide_mode("#b", HideMode::Invisible).await.unwrap());

        let stored = storage.load_site(HOST).await.unwrap();
        assert_eq!(stored.get("#b").unwrap().hide_mode, HideMode::Invisible);
        assert_eq!(
            finish(controller, recorded).await,
            vec![
                show("#b"),
                Command::SetHideMode {
                    selector: "#a".into(),
                    mode: HideMode::Invisible
                }
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_and_reorder_are_storage_only() {
        let storage = seeded(&["#a", "#b", "#c"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        assert!(controller.rename("#b", "  Sidebar  ").await.unwrap());
        assert!(controller.reorder(2, 0).await.unwrap());
        assert!(!controller.reorder(0, 9).await.unwrap());

        let stored = storage.load_site(HOST).await.unwrap();
        let order: Vec<&str> = stored.elements.iter().map(|e| e.selector.as_str()).collect();
        assert_eq!(order, vec!["#c", "#a", "#b"]);
        assert_eq!(stored.get("#b").unwrap().label, "Sidebar");
        assert!(finish(controller, recorded).await.is_empty());
    }

    #[tokio::test]
    async fn test_start_picker_reads_settings() {
        let storage = seeded(&[]).await;
        storage
            .save_settings(&Settings {
                multi_select: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let (page, recorded) = recording_page();
        let controller = SiteController::load(HOST, storage, page).await.unwrap();

        controller.start_picker().await;
        controller.stop_picker().await;
        assert_eq!(
            finish(controller, recorded).await,
            vec![Command::StartPicker { multi_select: true }, Command::StopPicker]
        );
    }

    #[tokio::test]
    async fn test_clear_site() {
        let storage = seeded(&["#a", "#b"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        controller.toggle("#a").await.unwrap();
        controller.clear_site().await.unwrap();
        assert!(controller.elements().is_empty());
        assert_eq!(storage.read_site(HOST).await.unwrap(), None);
        assert_eq!(finish(controller, recorded).await, vec![show("#a"), show("#b")]);
    }

    #[tokio::test]
    async fn test_element_hidden_updates_local_list_only() {
        let storage = seeded(&["#a"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        let event = PageEvent::ElementHidden {
            selector: "#new".into(),
            label: "New".into(),
        };
        assert!(controller.element_hidden(&event));
        assert!(!controller.element_hidden(&event));
        assert!(!controller.element_hidden(&PageEvent::Status {
            is_picker_active: false,
            hostname: HOST.into()
        }));

        assert_eq!(controller.elements().len(), 2);
        assert_eq!(storage.load_site(HOST).await.unwrap().len(), 1);
        assert!(finish(controller, recorded).await.is_empty());
    }

    #[tokio::test]
    async fn test_import_hides_new_elements() {
        let storage = seeded(&["#a"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        let json = r##"[
            { "selector": "#a", "label": "dup" },
            { "selector": "#b", "label": "b", "hideMode": "invisible" },
            { "selector": "#c", "label": "c", "isHidden": false }
        ]"##;
        assert_eq!(controller.import_json(json).await.unwrap(), 2);
        assert!(controller.import_json(r##"[{ "selector": "#d", "hideMode": "blur" }]"##).await.is_err());
        assert_eq!(storage.load_site(HOST).await.unwrap().len(), 3);

        assert_eq!(
            finish(controller, recorded).await,
            vec![Command::HideElement {
                selector: "#b".into(),
                mode: HideMode::Invisible
            }]
        );
    }

    #[tokio::test]
    async fn test_save_failure_still_updates_page() {
        let storage = seeded(&["#a", "#b", "#c"]).await;
        let (page, recorded) = recording_page();
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        storage.set_fail_writes(true);
        assert!(controller.toggle("#a").await.is_err());
        assert!(controller.set_hide_mode("#b", HideMode::Invisible).await.is_err());
        assert!(controller.delete("#c").await.is_err());
        assert!(controller.clear_site().await.is_err());
        assert!(controller.elements().is_empty());

        // Storage keeps the last good record; the page follows the panel
        assert_eq!(storage.load_site(HOST).await.unwrap().len(), 3);
        assert_eq!(
            finish(controller, recorded).await,
            vec![
                show("#a"),
                Command::SetHideMode {
                    selector: "#b".into(),
                    mode: HideMode::Invisible
                },
                show("#c"),
                show("#b")
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_page_is_ignored() {
        let storage = seeded(&["#a"]).await;
        let (page, rx) = page_channel(1, Duration::from_secs(5));
        drop(rx);
        let mut controller = SiteController::load(HOST, storage.clone(), page).await.unwrap();

        assert_eq!(controller.toggle("#a").await.unwrap(), Some(false));
        assert_eq!(controller.status().await, None);
        assert!(!storage.load_site(HOST).await.unwrap().get("#a").unwrap().is_hidden);
    }

    #[tokio::test]
    async fn test_site_listing() {
        let storage = MemoryStorage::new();
        for host in ["b.example", "a.example", "c.example"] {
            let mut site = SiteStorage::default();
            site.add(ManagedElement::picked("#x", "x", 1));
            storage.save_site(host, &site).await.unwrap();
        }
        storage
            .write_site("broken.example", serde_json::json!("garbage"))
            .await
            .unwrap();
        storage.save_settings(&Settings::default()).await.unwrap();

        let hosts: Vec<String> = list_sites(&storage)
            .await
            .unwrap()
            .into_iter()
            .map(|(host, _)| host)
            .collect();
        assert_eq!(hosts, vec!["a.example", "b.example", "c.example"]);

        delete_site(&storage, "b.example").await.unwrap();
        assert_eq!(clear_all_sites(&storage).await.unwrap(), 3);
        assert!(storage.site_hosts().await.unwrap().is_empty());
        assert!(storage.read_settings().await.unwrap().is_some());
    }
}
