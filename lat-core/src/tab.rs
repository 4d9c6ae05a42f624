//! Browser tab types observed by the relay agent

use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier
pub type TabId = i64;

/// Browser-assigned window identifier
pub type WindowId = i64;

/// Load status of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
    Unloaded,
}

/// Snapshot of a tab as reported by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<TabStatus>,
}

/// Payload of a tab activation notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInfo {
    pub tab_id: TabId,
    pub window_id: WindowId,
}

/// Properties that changed in a tab update notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabChangeInfo {
    #[serde(default)]
    pub status: Option<TabStatus>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl TabChangeInfo {
    /// Whether this update marks the tab as done loading
    pub fn is_complete(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }
}
