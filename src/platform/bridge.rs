//! Browser calls relayed through the extension.
//!
//! The host cannot touch tabs itself. Each [`TabHost`] call becomes a
//! numbered `call` line written to the extension, which performs the
//! `chrome.tabs` operation and answers with a `replyTo` line carrying the
//! same number.
//!
//! ```text
//! host → ext:  {"call":7,"op":"tabs.query","windowId":3}
//! ext → host:  {"replyTo":7,"ok":true,"tabs":[...]}
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot};

use super::TabHost;
use crate::types::errors::TabError;
use crate::types::tab::{TabId, TabInfo, WindowId};

/// The extension's answer to one bridged call.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReply {
    pub reply_to: u64,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub tabs: Option<Vec<TabInfo>>,
    #[serde(default)]
    pub tab_id: Option<TabId>,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct BrowserBridge {
    outbound: mpsc::UnboundedSender<Value>,
    pending: Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>,
    next_call: AtomicU64,
    timeout: Duration,
}

impl BrowserBridge {
    /// `outbound` receives every line that must be written to the extension.
    pub fn new(outbound: mpsc::UnboundedSender<Value>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(1),
            timeout,
        }
    }

    /// Hands a `replyTo` line to the call waiting for it.
    ///
    /// Returns false for malformed lines and for replies nobody is waiting on
    /// (for example after a timeout).
    pub fn resolve(&self, line: &Value) -> bool {
        let reply: BridgeReply = match serde_json::from_value(line.clone()) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "malformed bridge reply");
                return false;
            }
        };
        let waiter = match self.pending.lock() {
            Ok(mut pending) => pending.remove(&reply.reply_to),
            Err(_) => None,
        };
        match waiter {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                tracing::debug!(reply_to = reply.reply_to, "late or unknown bridge reply");
                false
            }
        }
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn forget(&self, call_id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&call_id);
        }
    }

    async fn call(&self, op: &str, args: Value) -> Result<BridgeReply, TabError> {
        let call_id = self.next_call.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| TabError::Unavailable("bridge lock poisoned".to_string()))?
            .insert(call_id, tx);

        let mut message = Map::new();
        message.insert("call".to_string(), json!(call_id));
        message.insert("op".to_string(), json!(op));
        if let Value::Object(fields) = args {
            message.extend(fields);
        }

        if self.outbound.send(Value::Object(message)).is_err() {
            self.forget(call_id);
            return Err(TabError::Unavailable("extension disconnected".to_string()));
        }

        let reply = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(TabError::Unavailable("reply channel closed".to_string()));
            }
            Err(_) => {
                self.forget(call_id);
                return Err(TabError::Timeout(self.timeout.as_millis() as u64));
            }
        };

        if reply.ok {
            Ok(reply)
        } else {
            Err(TabError::Unavailable(
                reply.error.unwrap_or_else(|| format!("{} failed", op)),
            ))
        }
    }
}

#[async_trait]
impl TabHost for BrowserBridge {
    async fn query_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>, TabError> {
        let reply = self.call("tabs.query", json!({ "windowId": window_id })).await?;
        Ok(reply.tabs.unwrap_or_default())
    }

    async fn reload(&self, tab_id: TabId) -> Result<(), TabError> {
        self.call("tabs.reload", json!({ "tabId": tab_id })).await?;
        Ok(())
    }

    async fn activate(&self, tab_id: TabId) -> Result<(), TabError> {
        self.call("tabs.update", json!({ "tabId": tab_id, "active": true }))
            .await?;
        Ok(())
    }

    async fn create_tab(&self, window_id: WindowId, url: &str) -> Result<TabId, TabError> {
        let reply = self
            .call("tabs.create", json!({ "windowId": window_id, "url": url }))
            .await?;
        reply
            .tab_id
            .ok_or_else(|| TabError::Unavailable("tabs.create returned no tabId".to_string()))
    }
}
