//! Per-site records: what the user hid on one hostname
//!
//! `SiteStorage` is the persisted shape. Element order is user-controlled
//! and every operation here preserves it; selectors are unique within a site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HiderError, Result};
use crate::migrate;

/// CSS strategy used to remove an element from view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HideMode {
    /// No layout box (`display: none`)
    #[default]
    Hidden,
    /// Layout space kept, nothing painted (`visibility: hidden`)
    Invisible,
}

impl HideMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HideMode::Hidden => "hidden",
            HideMode::Invisible => "invisible",
        }
    }

    /// Declaration block body for this mode's rule group
    pub fn css_declarations(&self) -> &'static str {
        match self {
            HideMode::Hidden => "display: none !important;",
            HideMode::Invisible => "visibility: hidden !important;",
        }
    }
}

impl fmt::Display for HideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HideMode {
    type Err = HiderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hidden" => Ok(HideMode::Hidden),
            "invisible" => Ok(HideMode::Invisible),
            other => Err(HiderError::InvalidHideMode(other.to_string())),
        }
    }
}

/// One element the user picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedElement {
    pub selector: String,
    pub label: String,
    /// Creation time, epoch milliseconds
    pub timestamp: u64,
    pub is_hidden: bool,
    pub hide_mode: HideMode,
}

impl ManagedElement {
    /// A fresh pick: hidden, with the default mode
    pub fn picked(selector: impl Into<String>, label: impl Into<String>, timestamp: u64) -> Self {
        Self {
            selector: selector.into(),
            label: label.into(),
            timestamp,
            is_hidden: true,
            hide_mode: HideMode::Hidden,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStorage {
    pub elements: Vec<ManagedElement>,
    /// Epoch milliseconds of the last page load that touched this record
    pub last_visited: u64,
}

impl SiteStorage {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn get(&self, selector: &str) -> Option<&ManagedElement> {
        self.elements.iter().find(|e| e.selector == selector)
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.get(selector).is_some()
    }

    fn get_mut(&mut self, selector: &str) -> Option<&mut ManagedElement> {
        self.elements.iter_mut().find(|e| e.selector == selector)
    }

    /// Append unless the selector is already managed; returns whether it was added
    pub fn add(&mut self, element: ManagedElement) -> bool {
        if self.contains(&element.selector) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Flip `is_hidden`; returns the new value
    pub fn toggle(&mut self, selector: &str) -> Option<bool> {
        let element = self.get_mut(selector)?;
        element.is_hidden = !element.is_hidden;
        Some(element.is_hidden)
    }

    /// Set every element to one state: hide all unless all are already hidden.
    /// Returns the state applied, `None` for an empty site.
    pub fn toggle_all(&mut self) -> Option<bool> {
        if self.elements.is_empty() {
            return None;
        }
        let next_hidden = !self.elements.iter().all(|e| e.is_hidden);
        for element in &mut self.elements {
            element.is_hidden = next_hidden;
        }
        Some(next_hidden)
    }

    pub fn rename(&mut self, selector: &str, label: impl Into<String>) -> bool {
        match self.get_mut(selector) {
            Some(element) => {
                element.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn set_hide_mode(&mut self, selector: &str, mode: HideMode) -> bool {
        match self.get_mut(selector) {
            Some(element) => {
                element.hide_mode = mode;
                true
            }
            None => false,
        }
    }

    /// Move the element at `from` so it ends up at index `to`; others keep their order
    pub fn move_element(&mut self, from: usize, to: usize) -> bool {
        let len = self.elements.len();
        if from >= len || to >= len {
            return false;
        }
        let element = self.elements.remove(from);
        self.elements.insert(to, element);
        true
    }

    pub fn remove(&mut self, selector: &str) -> Option<ManagedElement> {
        let index = self.elements.iter().position(|e| e.selector == selector)?;
        Some(self.elements.remove(index))
    }

    /// Selectors that should be hidden right now, in list order
    pub fn hidden_selectors(&self) -> Vec<(&str, HideMode)> {
        self.elements
            .iter()
            .filter(|e| e.is_hidden)
            .map(|e| (e.selector.as_str(), e.hide_mode))
            .collect()
    }

    /// Merge an exported element list; returns how many were new.
    ///
    /// The whole import is rejected if any element fails validation.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let incoming = migrate::migrate_elements(value)?;
        let mut added = 0;
        for element in incoming {
            if self.add(element) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.elements)?)
    }
}
