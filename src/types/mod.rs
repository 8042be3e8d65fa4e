// tabpilot shared type definitions
// Each submodule defines types used across the host and the popup view.

pub mod command;
pub mod default_tab;
pub mod errors;
pub mod refresh;
pub mod rotation;
pub mod settings;
pub mod tab;
