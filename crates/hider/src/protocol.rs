//! Message types exchanged between a page and its collaborators
//!
//! Wire format is JSON with a `type` discriminator, e.g.
//! `{"type":"HIDE_ELEMENT","selector":"#ad","mode":"invisible"}`.

use serde::{Deserialize, Serialize};

use crate::site::HideMode;

/// Inbound: collaborator → page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    StartPicker {
        #[serde(rename = "multiSelect", default)]
        multi_select: bool,
    },
    StopPicker,
    ShowElement {
        selector: String,
    },
    HideElement {
        selector: String,
        #[serde(default)]
        mode: HideMode,
    },
    SetHideMode {
        selector: String,
        mode: HideMode,
    },
    GetStatus,
}

/// Reply to a `Command`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Ack,
    Status {
        #[serde(rename = "isPickerActive")]
        is_picker_active: bool,
        hostname: String,
    },
}

/// Outbound: page → collaborators, unprompted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageEvent {
    /// A pick completed and was hidden
    ElementHidden { selector: String, label: String },
    Status {
        #[serde(rename = "isPickerActive")]
        is_picker_active: bool,
        hostname: String,
    },
}
