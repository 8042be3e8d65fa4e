//! Message handler for the tabpilot host protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdio.
//! [`handle_message`] turns one decoded line (a command or a browser event)
//! into the JSON response sent back to the extension.

use serde_json::{json, Map, Value};

use crate::app::App;
use crate::managers::default_tab_manager::DefaultTabManagerTrait;
use crate::services::refresh_scheduler::RefreshSchedulerTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::command::{BrowserEvent, Command, Outcome};
use crate::types::errors::{RegistryError, RpcError};

/// Kind of an incoming line, decided by which tag field it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Event,
    Reply,
    Unknown,
}

pub fn classify(message: &Value) -> MessageKind {
    if message.get("replyTo").is_some() {
        MessageKind::Reply
    } else if message.get("action").is_some() {
        MessageKind::Command
    } else if message.get("event").is_some() {
        MessageKind::Event
    } else {
        MessageKind::Unknown
    }
}

/// Handle one command or event line and build its response.
///
/// Never fails: errors become `{"success": false, "error": ...}`. A request
/// `id`, when present, is echoed back.
pub async fn handle_message(app: &App, message: &Value) -> Value {
    let result = match classify(message) {
        MessageKind::Command => match decode_command(message) {
            Ok(command) => handle_command(app, command).await,
            Err(e) => Err(e),
        },
        MessageKind::Event => match decode::<BrowserEvent>(message) {
            Ok(event) => handle_event(app, event).await,
            Err(e) => Err(e),
        },
        MessageKind::Reply | MessageKind::Unknown => Err(RpcError::Parse(
            "expected an \"action\" or \"event\" field".to_string(),
        )),
    };

    let mut response = match result {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "message failed");
            json!({ "success": false, "error": e.to_string() })
        }
    };
    if let (Some(id), Value::Object(map)) = (message.get("id"), &mut response) {
        map.insert("id".to_string(), id.clone());
    }
    response
}

fn decode_command(message: &Value) -> Result<Command, RpcError> {
    match message.get("action") {
        Some(Value::String(action)) if !Command::is_known_action(action) => {
            Err(RpcError::UnknownAction(action.clone()))
        }
        _ => decode(message),
    }
}

fn decode<T: serde::de::DeserializeOwned>(message: &Value) -> Result<T, RpcError> {
    serde_json::from_value(message.clone()).map_err(|e| RpcError::Parse(e.to_string()))
}

fn success(fields: Value) -> Value {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    if let Value::Object(extra) = fields {
        body.extend(extra);
    }
    Value::Object(body)
}

fn outcome(outcome: Outcome) -> Value {
    success(json!({ "outcome": outcome }))
}

/// Dispatch a decoded command.
pub async fn handle_command(app: &App, command: Command) -> Result<Value, RpcError> {
    match command {
        // ─── Refresh ───
        Command::UpdateTabInterval { tab_id, interval } => {
            let entry = app.scheduler.set_interval(tab_id, interval)?;
            Ok(success(json!({ "outcome": Outcome::Updated, "entry": entry })))
        }
        Command::RemoveTabRefresh { tab_id } => {
            Ok(outcome(app.scheduler.clear_interval(tab_id)?))
        }
        Command::ListRefreshEntries => {
            let entries = app.scheduler.entries()?;
            Ok(success(json!({ "refreshData": entries })))
        }

        // ─── Default tabs ───
        Command::AddDefaultTab { url, interval } => {
            let entry = app.default_tabs.append(&url, interval)?;
            Ok(success(json!({ "entry": entry })))
        }
        Command::RemoveDefaultTab { index } => match app.default_tabs.remove_at(index) {
            Ok(removed) => Ok(success(json!({ "outcome": Outcome::Removed, "entry": removed }))),
            Err(RegistryError::OutOfRange { .. }) => Ok(outcome(Outcome::OutOfRange)),
            Err(e) => Err(e.into()),
        },
        Command::RemoveDefaultTabById { id } => match app.default_tabs.remove_by_id(&id) {
            Ok(removed) => Ok(success(json!({ "outcome": Outcome::Removed, "entry": removed }))),
            Err(RegistryError::UnknownId(_)) => Ok(outcome(Outcome::NotFound)),
            Err(e) => Err(e.into()),
        },
        Command::ListDefaultTabs => {
            let tabs = app.default_tabs.list()?;
            Ok(success(json!({ "defaultTabs": tabs })))
        }
        Command::OpenDefaultTab { index, window_id } => {
            match app
                .default_tabs
                .open_now(app.host.as_ref(), &app.scheduler, index, window_id)
                .await
            {
                Ok(tab_id) => Ok(success(json!({ "tabId": tab_id }))),
                Err(RegistryError::OutOfRange { .. }) => Ok(outcome(Outcome::OutOfRange)),
                Err(e) => Err(e.into()),
            }
        }

        // ─── Rotation ───
        Command::EnableRotation {
            window_id,
            interval_secs,
        } => {
            let state = app.with_rotation(|r| r.enable(window_id, interval_secs))?;
            Ok(success(json!({ "rotation": state })))
        }
        Command::DisableRotation => {
            app.with_rotation(|r| r.disable())?;
            Ok(success(json!({})))
        }
        Command::GetRotation => {
            let (state, running) = app.with_rotation(|r| (r.state(), r.is_running()));
            let state = state?;
            Ok(success(json!({ "rotation": state, "running": running })))
        }

        // ─── Settings ───
        Command::GetSettings => Ok(success(json!({ "settings": app.settings() }))),
        Command::UpdateSetting { key, value } => {
            app.with_settings(|engine| engine.set_value(&key, value))?;
            Ok(success(json!({ "settings": app.settings() })))
        }
        Command::ResetSettings => {
            app.with_settings(|engine| engine.reset())?;
            Ok(success(json!({ "settings": app.settings() })))
        }

        Command::Ping => Ok(success(json!({
            "pong": true,
            "version": env!("CARGO_PKG_VERSION")
        }))),
    }
}

/// Dispatch a decoded browser event.
pub async fn handle_event(app: &App, event: BrowserEvent) -> Result<Value, RpcError> {
    match event {
        BrowserEvent::WindowCreated { window_id, kind } => {
            let opened = app.on_window_created(window_id, kind).await?;
            Ok(success(json!({ "opened": opened })))
        }
        BrowserEvent::TabRemoved { tab_id } => {
            let pruned = app.on_tab_removed(tab_id)?;
            Ok(success(json!({ "pruned": pruned })))
        }
        BrowserEvent::Alarm => {
            let report = app.run_refresh_check().await?;
            Ok(success(json!({
                "reloaded": report.reloaded,
                "failed": report.failed
            })))
        }
    }
}
