//! Messages exchanged between the extension and the host.
//!
//! Commands and events keep the extension's existing camelCase field names.

use serde::{Deserialize, Deserializer, Serialize};

use super::tab::{TabId, WindowId, WindowKind};

/// A request sent by the popup (or any extension page).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    UpdateTabInterval {
        #[serde(rename = "tabId", deserialize_with = "deserialize_tab_id")]
        tab_id: TabId,
        interval: i64,
    },
    RemoveTabRefresh {
        #[serde(rename = "tabId", deserialize_with = "deserialize_tab_id")]
        tab_id: TabId,
    },
    AddDefaultTab {
        url: String,
        interval: i64,
    },
    RemoveDefaultTab {
        index: i64,
    },
    RemoveDefaultTabById {
        id: String,
    },
    ListDefaultTabs,
    OpenDefaultTab {
        index: i64,
        #[serde(rename = "windowId")]
        window_id: WindowId,
    },
    EnableRotation {
        #[serde(rename = "windowId")]
        window_id: WindowId,
        #[serde(rename = "intervalSec")]
        interval_secs: i64,
    },
    DisableRotation,
    GetRotation,
    ListRefreshEntries,
    GetSettings,
    /// `key` is a flat `HostSettings` field name.
    UpdateSetting {
        key: String,
        value: serde_json::Value,
    },
    ResetSettings,
    Ping,
}

/// Every `action` tag [`Command`] accepts.
pub const COMMAND_ACTIONS: &[&str] = &[
    "updateTabInterval",
    "removeTabRefresh",
    "addDefaultTab",
    "removeDefaultTab",
    "removeDefaultTabById",
    "listDefaultTabs",
    "openDefaultTab",
    "enableRotation",
    "disableRotation",
    "getRotation",
    "listRefreshEntries",
    "getSettings",
    "updateSetting",
    "resetSettings",
    "ping",
];

impl Command {
    pub fn is_known_action(action: &str) -> bool {
        COMMAND_ACTIONS.contains(&action)
    }
}

/// A notification forwarded from a browser event listener.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BrowserEvent {
    WindowCreated {
        #[serde(rename = "windowId")]
        window_id: WindowId,
        #[serde(rename = "type", default)]
        kind: WindowKind,
    },
    TabRemoved {
        #[serde(rename = "tabId", deserialize_with = "deserialize_tab_id")]
        tab_id: TabId,
    },
    Alarm,
}

/// What a mutating command actually did.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Updated,
    Removed,
    NotFound,
    OutOfRange,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TabIdRepr {
    Int(i64),
    Str(String),
}

/// Tab ids arrive as numbers from some pages and as strings from the popup.
pub fn deserialize_tab_id<'de, D>(deserializer: D) -> Result<TabId, D::Error>
where
    D: Deserializer<'de>,
{
    match TabIdRepr::deserialize(deserializer)? {
        TabIdRepr::Int(id) => Ok(id),
        TabIdRepr::Str(s) => s
            .trim()
            .parse::<TabId>()
            .map_err(|_| serde::de::Error::custom(format!("invalid tab id: {:?}", s))),
    }
}
