// tabpilot state managers
// Managers handle stateful collections: the in-memory tab model and the default-tab registry.

pub mod default_tab_manager;
pub mod tab_manager;
