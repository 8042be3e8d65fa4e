// tabpilot platform layer
// Filesystem locations, and the browser surface the coordinator drives.

pub mod bridge;
mod paths;

pub use paths::{get_config_dir, get_data_dir, get_database_path, DATA_DIR_ENV};

use async_trait::async_trait;

use crate::types::errors::TabError;
use crate::types::tab::{TabId, TabInfo, WindowId};

/// The browser operations the host needs.
///
/// Implemented by [`bridge::BrowserBridge`] for a live extension and by
/// [`TabManager`](crate::managers::tab_manager::TabManager) in memory.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Tabs of a window in strip order. An unknown window yields an empty list.
    async fn query_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, TabError>;
    async fn reload(&self, tab_id: TabId) -> Result<(), TabError>;
    /// Make `tab_id` the active tab of its window.
    async fn activate(&self, tab_id: TabId) -> Result<(), TabError>;
    /// Open `url` in a background tab of `window_id` and return the new tab's id.
    async fn create_tab(&self, window_id: WindowId, url: &str) -> Result<TabId, TabError>;
}
