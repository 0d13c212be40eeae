use crate::util::parse_bool_flag;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_STREAM_LOG_PATH: &str = "/tmp/reel-stream-debug.log";
const DEBUG_STREAM_ENV: &str = "REEL_DEBUG_STREAM";
const STREAM_LOG_PATH_ENV: &str = "REEL_STREAM_LOG_PATH";

pub fn debug_stream_enabled() -> bool {
    std::env::var(DEBUG_STREAM_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

pub fn emit_request_debug(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message =
        format!("REEL_API DEBUG message_request url={request_url}\npayload:\n{formatted_payload}\n");
    emit_log_message(&message);
}

/// Records a payload that fell back to a verbatim token. The fallback is
/// normal operation, so this only fires when stream debugging is on.
pub fn emit_decode_fallback(payload: &str) {
    let message = format!("REEL_API DEBUG decode_fallback payload:\n{payload}\n");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(STREAM_LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_STREAM_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
