//! tabpilot database layer.
//!
//! Schema migrations and the SQLite-backed named-record store every
//! component reads and writes.
//!
//! # Usage
//!
//! ```no_run
//! use tabpilot::database::KeyValueStore;
//!
//! let store = KeyValueStore::open("tabpilot.db").expect("failed to open store");
//! let tabs: Vec<String> = store.get("example", Vec::new()).expect("read failed");
//! ```

pub mod migrations;
pub mod store;

pub use store::{Database, KeyValueStore, DEFAULT_TABS_KEY, REFRESH_DATA_KEY, ROTATION_DATA_KEY};
