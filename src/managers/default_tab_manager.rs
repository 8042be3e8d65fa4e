//! Default-Tab Registry for tabpilot.
//!
//! An ordered list of URLs (each with a refresh interval) opened in every
//! new normal window. Entries are addressed by position, as the popup does,
//! or by the stable id each entry carries.

use std::sync::Arc;

use crate::database::{KeyValueStore, DEFAULT_TABS_KEY};
use crate::platform::TabHost;
use crate::services::refresh_scheduler::RefreshScheduler;
use crate::types::default_tab::DefaultTabEntry;
use crate::types::errors::RegistryError;
use crate::types::tab::{TabId, WindowId};

/// Trait defining default-tab registry operations.
pub trait DefaultTabManagerTrait {
    fn append(&self, url: &str, interval_minutes: i64) -> Result<DefaultTabEntry, RegistryError>;
    fn remove_at(&self, index: i64) -> Result<DefaultTabEntry, RegistryError>;
    fn remove_by_id(&self, id: &str) -> Result<DefaultTabEntry, RegistryError>;
    fn list(&self) -> Result<Vec<DefaultTabEntry>, RegistryError>;
    fn len(&self) -> Result<usize, RegistryError>;
}

pub struct DefaultTabManager {
    store: Arc<KeyValueStore>,
}

impl DefaultTabManager {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    /// Open every entry, in order, in `window_id` and schedule its refresh.
    ///
    /// Entries whose tab fails to open are skipped. Returns the ids of the
    /// tabs that were opened.
    pub async fn apply_to_window(
        &self,
        host: &dyn TabHost,
        scheduler: &RefreshScheduler,
        window_id: WindowId,
    ) -> Result<Vec<TabId>, RegistryError> {
        let entries = self.list()?;
        let mut opened = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(tab_id) = open_entry(host, scheduler, window_id, entry).await? {
                opened.push(tab_id);
            }
        }
        tracing::info!(window_id, opened = opened.len(), total = entries.len(), "default tabs applied");
        Ok(opened)
    }

    /// Open a single entry now ("Open Now" in the popup).
    pub async fn open_now(
        &self,
        host: &dyn TabHost,
        scheduler: &RefreshScheduler,
        index: i64,
        window_id: WindowId,
    ) -> Result<Option<TabId>, RegistryError> {
        let entries = self.list()?;
        let entry = checked_index(index, entries.len()).map(|i| &entries[i]).ok_or(
            RegistryError::OutOfRange {
                index,
                len: entries.len(),
            },
        )?;
        open_entry(host, scheduler, window_id, entry).await
    }
}

async fn open_entry(
    host: &dyn TabHost,
    scheduler: &RefreshScheduler,
    window_id: WindowId,
    entry: &DefaultTabEntry,
) -> Result<Option<TabId>, RegistryError> {
    match host.create_tab(window_id, &entry.url).await {
        Ok(tab_id) => {
            scheduler.set_interval(tab_id, entry.interval_minutes)?;
            Ok(Some(tab_id))
        }
        Err(e) => {
            tracing::debug!(window_id, url = %entry.url, error = %e, "default tab not opened");
            Ok(None)
        }
    }
}

fn checked_index(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < len)
}

impl DefaultTabManagerTrait for DefaultTabManager {
    fn append(&self, url: &str, interval_minutes: i64) -> Result<DefaultTabEntry, RegistryError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RegistryError::InvalidUrl(url.to_string()));
        }
        let entry = DefaultTabEntry::new(url, interval_minutes);
        let stored = entry.clone();
        self.store
            .update(DEFAULT_TABS_KEY, Vec::<DefaultTabEntry>::new(), move |tabs| {
                tabs.push(stored)
            })?;
        tracing::info!(url = %entry.url, interval = interval_minutes, "default tab added");
        Ok(entry)
    }

    /// Remove by position. Out-of-range leaves the stored list untouched.
    fn remove_at(&self, index: i64) -> Result<DefaultTabEntry, RegistryError> {
        // Read-only check first so an out-of-range index never rewrites the record.
        let len = self.len()?;
        let Some(position) = checked_index(index, len) else {
            return Err(RegistryError::OutOfRange { index, len });
        };
        let removed = self
            .store
            .update(DEFAULT_TABS_KEY, Vec::<DefaultTabEntry>::new(), |tabs| {
                (position < tabs.len()).then(|| tabs.remove(position))
            })?;
        removed.ok_or(RegistryError::OutOfRange { index, len })
    }

    fn remove_by_id(&self, id: &str) -> Result<DefaultTabEntry, RegistryError> {
        let removed = self
            .store
            .update(DEFAULT_TABS_KEY, Vec::<DefaultTabEntry>::new(), |tabs| {
                tabs.iter()
                    .position(|t| t.id == id)
                    .map(|pos| tabs.remove(pos))
            })?;
        removed.ok_or_else(|| RegistryError::UnknownId(id.to_string()))
    }

    /// Reads through `update` so ids minted for entries stored without one
    /// are persisted and stay stable.
    fn list(&self) -> Result<Vec<DefaultTabEntry>, RegistryError> {
        Ok(self
            .store
            .update(DEFAULT_TABS_KEY, Vec::<DefaultTabEntry>::new(), |tabs| tabs.clone())?)
    }

    fn len(&self) -> Result<usize, RegistryError> {
        Ok(self
            .store
            .get(DEFAULT_TABS_KEY, Vec::<DefaultTabEntry>::new())?
            .len())
    }
}
