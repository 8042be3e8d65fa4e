use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::platform::TabHost;
use crate::types::errors::TabError;
use crate::types::tab::{TabId, TabInfo, WindowId, WindowKind};

/// Trait defining the in-memory window/tab model interface.
pub trait TabManagerTrait {
    fn open_window(&mut self, kind: WindowKind) -> WindowId;
    fn close_window(&mut self, window_id: WindowId) -> Result<Vec<TabId>, TabError>;
    fn create_tab(&mut self, window_id: WindowId, url: &str, active: bool) -> Result<TabId, TabError>;
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn switch_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn clear_active(&mut self, window_id: WindowId);
    fn reload_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn get_tab(&self, tab_id: TabId) -> Option<&TabInfo>;
    fn tabs_in_window(&self, window_id: WindowId) -> Vec<TabInfo>;
    fn active_tab(&self, window_id: WindowId) -> Option<TabId>;
    fn window_kind(&self, window_id: WindowId) -> Option<WindowKind>;
    fn reload_count(&self, tab_id: TabId) -> u32;
    fn tab_count(&self) -> usize;
}

/// In-memory stand-in for the browser's windows and tabs.
///
/// Wrapped in a `Mutex` it implements [`TabHost`], which is how tests and the
/// simulated host drive the coordinator without a live extension.
pub struct TabManager {
    windows: Vec<(WindowId, WindowKind)>,
    tabs: Vec<TabInfo>,
    active: HashMap<WindowId, TabId>,
    reloads: HashMap<TabId, u32>,
    next_window_id: WindowId,
    next_tab_id: TabId,
}

impl TabManager {
    pub fn new() -> Self {
        Self {
            windows: Vec::new(),
            tabs: Vec::new(),
            active: HashMap::new(),
            reloads: HashMap::new(),
            next_window_id: 1,
            next_tab_id: 1,
        }
    }

    fn find_tab_index(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn has_window(&self, window_id: WindowId) -> bool {
        self.windows.iter().any(|(id, _)| *id == window_id)
    }

    fn window_tab_ids(&self, window_id: WindowId) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .map(|t| t.id)
            .collect()
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TabManagerTrait for TabManager {
    fn open_window(&mut self, kind: WindowKind) -> WindowId {
        let id = self.next_window_id;
        self.next_window_id += 1;
        self.windows.push((id, kind));
        id
    }

    /// Close a window and every tab in it. Returns the ids of the closed tabs.
    fn close_window(&mut self, window_id: WindowId) -> Result<Vec<TabId>, TabError> {
        if !self.has_window(window_id) {
            return Err(TabError::WindowNotFound(window_id));
        }
        let closed = self.window_tab_ids(window_id);
        self.tabs.retain(|t| t.window_id != window_id);
        for id in &closed {
            self.reloads.remove(id);
        }
        self.active.remove(&window_id);
        self.windows.retain(|(id, _)| *id != window_id);
        Ok(closed)
    }

    /// Append a tab to the window's strip. The first tab of a window becomes
    /// active even when `active` is false.
    fn create_tab(&mut self, window_id: WindowId, url: &str, active: bool) -> Result<TabId, TabError> {
        if !self.has_window(window_id) {
            return Err(TabError::WindowNotFound(window_id));
        }
        let id = self.next_tab_id;
        self.next_tab_id += 1;
        self.tabs.push(TabInfo {
            id,
            window_id,
            index: 0,
            url: url.to_string(),
            title: None,
            active: false,
        });
        if active || !self.active.contains_key(&window_id) {
            self.active.insert(window_id, id);
        }
        Ok(id)
    }

    /// Close a tab. If it was active, the right-hand neighbour (or the new
    /// last tab) takes over.
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        let idx = self
            .find_tab_index(tab_id)
            .ok_or(TabError::NotFound(tab_id))?;
        let window_id = self.tabs[idx].window_id;
        let order = self.window_tab_ids(window_id);
        let order_idx = order.iter().position(|id| *id == tab_id).unwrap_or(0);

        self.tabs.remove(idx);
        self.reloads.remove(&tab_id);

        if self.active.get(&window_id) == Some(&tab_id) {
            let remaining = self.window_tab_ids(window_id);
            if remaining.is_empty() {
                self.active.remove(&window_id);
            } else {
                let next = order_idx.min(remaining.len() - 1);
                self.active.insert(window_id, remaining[next]);
            }
        }
        Ok(())
    }

    fn switch_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        let idx = self
            .find_tab_index(tab_id)
            .ok_or(TabError::NotFound(tab_id))?;
        let window_id = self.tabs[idx].window_id;
        self.active.insert(window_id, tab_id);
        Ok(())
    }

    /// Leave the window with no active tab (a transient state browsers can report).
    fn clear_active(&mut self, window_id: WindowId) {
        self.active.remove(&window_id);
    }

    fn reload_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        if self.find_tab_index(tab_id).is_none() {
            return Err(TabError::NotFound(tab_id));
        }
        *self.reloads.entry(tab_id).or_insert(0) += 1;
        Ok(())
    }

    fn get_tab(&self, tab_id: TabId) -> Option<&TabInfo> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    /// Tabs of the window in strip order, with `index` and `active` filled in.
    fn tabs_in_window(&self, window_id: WindowId) -> Vec<TabInfo> {
        let active = self.active.get(&window_id).copied();
        self.tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .enumerate()
            .map(|(index, t)| TabInfo {
                index,
                active: Some(t.id) == active,
                ..t.clone()
            })
            .collect()
    }

    fn active_tab(&self, window_id: WindowId) -> Option<TabId> {
        self.active.get(&window_id).copied()
    }

    fn window_kind(&self, window_id: WindowId) -> Option<WindowKind> {
        self.windows
            .iter()
            .find(|(id, _)| *id == window_id)
            .map(|(_, kind)| *kind)
    }

    fn reload_count(&self, tab_id: TabId) -> u32 {
        self.reloads.get(&tab_id).copied().unwrap_or(0)
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}

fn poisoned() -> TabError {
    TabError::Unavailable("tab model lock poisoned".to_string())
}

#[async_trait]
impl TabHost for Mutex<TabManager> {
    async fn query_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, TabError> {
        Ok(self.lock().map_err(|_| poisoned())?.tabs_in_window(window_id))
    }

    async fn reload(&self, tab_id: TabId) -> Result<(), TabError> {
        self.lock().map_err(|_| poisoned())?.reload_tab(tab_id)
    }

    async fn activate(&self, tab_id: TabId) -> Result<(), TabError> {
        self.lock().map_err(|_| poisoned())?.switch_tab(tab_id)
    }

    async fn create_tab(&self, window_id: WindowId, url: &str) -> Result<TabId, TabError> {
        self.lock()
            .map_err(|_| poisoned())?
            .create_tab(window_id, url, false)
    }
}
