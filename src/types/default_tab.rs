use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A URL opened (with a refresh interval) in every new normal window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultTabEntry {
    pub url: String,
    #[serde(default, rename = "interval")]
    pub interval_minutes: i64,
    /// Stable identifier. Entries written before ids existed get a fresh one on read.
    #[serde(default = "new_entry_id")]
    pub id: String,
}

impl DefaultTabEntry {
    pub fn new(url: impl Into<String>, interval_minutes: i64) -> Self {
        Self {
            url: url.into(),
            interval_minutes,
            id: new_entry_id(),
        }
    }
}

fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}
