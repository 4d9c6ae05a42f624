//! Tab cache
//!
//! Host environments that cannot query the browser on demand (native
//! messaging, replay) learn about tabs from the notifications they receive
//! and answer [`TabsApi`] lookups from this cache.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use lat_core::{PlatformError, Tab, TabId, TabsApi};

#[derive(Debug, Default)]
pub struct TabCache {
    tabs: RwLock<HashMap<TabId, Tab>>,
}

impl TabCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tab snapshot
    pub fn upsert(&self, tab: Tab) {
        self.tabs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tab.id, tab);
    }

    pub fn remove(&self, tab_id: TabId) -> Option<Tab> {
        self.tabs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TabsApi for TabCache {
    async fn get(&self, tab_id: TabId) -> Result<Tab, PlatformError> {
        self.tabs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tab_id)
            .cloned()
            .ok_or(PlatformError::TabNotFound(tab_id))
    }
}
