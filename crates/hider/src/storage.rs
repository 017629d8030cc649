//! Persistence - two explicit partitions behind one async trait
//!
//! Sites are keyed by hostname; settings live in their own partition, so no
//! key ever needs to be filtered out of a site listing.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{HiderError, Result};
use crate::migrate;
use crate::site::SiteStorage;

/// User preferences shared by every site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    /// Keep the picker active after a pick
    pub multi_select: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            multi_select: false,
        }
    }
}

/// Storage backend. Implementors provide the raw partitions; typed access
/// and migration come for free.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn read_site(&self, host: &str) -> Result<Option<Value>>;

    async fn write_site(&self, host: &str, value: Value) -> Result<()>;

    async fn remove_site(&self, host: &str) -> Result<()>;

    /// Every hostname with a stored record
    async fn site_hosts(&self) -> Result<Vec<String>>;

    async fn read_settings(&self) -> Result<Option<Value>>;

    async fn write_settings(&self, value: Value) -> Result<()>;

    /// Load and migrate; a missing record is an empty site
    async fn load_site(&self, host: &str) -> Result<SiteStorage> {
        match self.read_site(host).await? {
            Some(value) => migrate::migrate_site(value),
            None => Ok(SiteStorage::default()),
        }
    }

    /// Write the current format; an empty element list removes the record
    async fn save_site(&self, host: &str, site: &SiteStorage) -> Result<()> {
        if site.is_empty() {
            return self.remove_site(host).await;
        }
        self.write_site(host, migrate::to_stored(site)?).await
    }

    async fn load_settings(&self) -> Result<Settings> {
        match self.read_settings().await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Settings::default()),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_settings(serde_json::to_value(settings)?).await
    }
}

/// In-process backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    sites: Arc<DashMap<String, Value>>,
    settings: Arc<RwLock<Option<Value>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (quota errors, disconnected backends)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HiderError::Storage("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for MemoryStorage {
    async fn read_site(&self, host: &str) -> Result<Option<Value>> {
        Ok(self.sites.get(host).map(|v| v.value().clone()))
    }

    async fn write_site(&self, host: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        self.sites.insert(host.to_string(), value);
        Ok(())
    }

    async fn remove_site(&self, host: &str) -> Result<()> {
        self.check_writable()?;
        self.sites.remove(host);
        Ok(())
    }

    async fn site_hosts(&self) -> Result<Vec<String>> {
        let mut hosts: Vec<String> = self.sites.iter().map(|e| e.key().clone()).collect();
        hosts.sort();
        Ok(hosts)
    }

    async fn read_settings(&self) -> Result<Option<Value>> {
        Ok(self.settings.read().await.clone())
    }

    async fn write_settings(&self, value: Value) -> Result<()> {
        self.check_writable()?;
        *self.settings.write().await = Some(value);
        Ok(())
    }
}
