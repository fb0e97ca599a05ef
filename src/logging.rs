use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "calendar-settings.log";
const MAX_HTTP_LOGS: usize = 100;

/// Global log storage for HTTP requests
static HTTP_LOGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Install the tracing subscriber.
///
/// The terminal is owned by the settings UI, so output goes to a log file in
/// `dir`. Filtering follows `RUST_LOG` and defaults to `info`.
pub fn init(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(())
}

/// Log an HTTP request
pub fn log_request(method: &str, url: &str) {
    tracing::debug!(method, url, "caldav request");
    push(format!("{} {}", method, url));
}

/// Log an HTTP response
pub fn log_response(status: u16, url: &str) {
    tracing::debug!(status, url, "caldav response");
    push(format!("<- {} {}", status, url));
}

fn push(line: String) {
    if let Ok(mut logs) = HTTP_LOGS.lock() {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        logs.push(format!("[{}] {}", timestamp, line));
        if logs.len() > MAX_HTTP_LOGS {
            logs.remove(0);
        }
    }
}

/// Get recent logs for display, newest first
pub fn get_recent_logs(count: usize) -> Vec<String> {
    if let Ok(logs) = HTTP_LOGS.lock() {
        logs.iter().rev().take(count).cloned().collect()
    } else {
        Vec::new()
    }
}
