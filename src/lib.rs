//! tabpilot: companion host for a tab auto-refresh and rotation browser extension.
//!
//! This library crate exposes all modules for use by the host binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
