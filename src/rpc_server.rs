//! tabpilot host: the extension's background coordinator as a native process.
//!
//! Protocol: one JSON object per line (newline-delimited JSON) on stdin/stdout.
//! Command:  {"id":1, "action":"updateTabInterval", "tabId":"5", "interval":10}
//! Event:    {"event":"windowCreated", "windowId":3, "type":"normal"}
//! Reply:    {"replyTo":7, "ok":true, "tabs":[...]}   (answer to a host call)
//! Response: {"id":1, "success":true, ...} or {"id":1, "success":false, "error":"..."}

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use tabpilot::app::App;
use tabpilot::platform::{self, bridge::BrowserBridge, TabHost};
use tabpilot::rpc_handler::{classify, handle_message, MessageKind};
use tabpilot::services::logging::init_logging;
use tabpilot::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabpilot::types::settings::HostSettings;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Load settings from disk. On failure the engine keeps defaults and the
/// error is returned for logging once the subscriber is up.
fn load_settings() -> (SettingsEngine, HostSettings, Option<String>) {
    let mut engine = SettingsEngine::new(None);
    match engine.load() {
        Ok(settings) => (engine, settings, None),
        Err(e) => (engine, HostSettings::default(), Some(e.to_string())),
    }
}

#[tokio::main]
async fn main() {
    let (engine, settings, settings_error) = load_settings();
    init_logging(&settings.log_filter);
    if let Some(e) = settings_error {
        tracing::warn!(error = %e, "using default settings");
    }

    let db_path = platform::get_database_path();
    if let Some(dir) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::error!(path = %dir.display(), error = %e, "cannot create data directory");
        }
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let bridge = Arc::new(BrowserBridge::new(
        out_tx.clone(),
        Duration::from_millis(settings.bridge_timeout_ms),
    ));
    let host: Arc<dyn TabHost> = bridge.clone();

    let app = match App::open(&db_path, host, engine) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "failed to open store");
            std::process::exit(1);
        }
    };

    // Single writer for stdout so lines never interleave.
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = out_rx.recv().await {
            let mut line = message.to_string();
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    });

    let _ = out_tx.send(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    app.startup();
    app.start_alarm();
    tracing::info!(db = %db_path.display(), "host ready");

    // Max 200 messages per second; bridge replies are exempt.
    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };
        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id": null, "success": false, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        if classify(&message) == MessageKind::Reply {
            bridge.resolve(&message);
            continue;
        }

        if !rate_limiter.check() {
            let id = message.get("id").cloned().unwrap_or(Value::Null);
            let _ = out_tx.send(json!({"id": id, "success": false, "error": "rate limit exceeded"}));
            continue;
        }

        // Handlers may wait on bridge replies that arrive on this same loop,
        // so they must not run inline.
        let app = Arc::clone(&app);
        let out = out_tx.clone();
        tokio::spawn(async move {
            let response = handle_message(&app, &message).await;
            let _ = out.send(response);
        });
    }

    app.shutdown();
    drop(out_tx);
    drop(app);
    drop(bridge);
    // In-flight handlers still hold senders until their bridge calls time out.
    let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
}
