use super::logging::{debug_stream_enabled, emit_decode_fallback};
use crate::types::{
    StreamEvent, STATUS_DATABASE, STATUS_ORGANIZING, STATUS_PREPARING, STATUS_SEARCHING,
};
use serde::Deserialize;
use serde_json::Value;

const RECORD_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for the line-oriented message stream.
///
/// Chunks arrive in order but split logical records arbitrarily, including
/// inside multi-byte characters, so the residual buffer holds raw bytes and
/// text conversion happens per complete line. Feeding the same byte stream
/// produces the same events no matter where the chunk boundaries fall.
#[derive(Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

/// Wire shape of a structured record: `{"type": ..., "content": ...}`.
/// Both fields are optional on purpose; anything that does not fit is
/// handled by the verbatim-token fallback.
#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Value,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a done record has been decoded; later input is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if !self.finished {
                let line = String::from_utf8_lossy(&self.buffer[start..end]);
                if let Some(event) = decode_line(line.trim_end_matches('\r')) {
                    self.finished = matches!(event, StreamEvent::Done);
                    events.push(event);
                }
            }
            start = end + 1;
        }

        if self.finished {
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }
}

fn decode_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(RECORD_PREFIX)?;
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<WireRecord>(payload) {
        Ok(record) => Some(decode_record(record, payload)),
        Err(_) => {
            // Content text can legitimately look like partial JSON, so an
            // unparseable payload is forwarded verbatim rather than dropped.
            if debug_stream_enabled() {
                emit_decode_fallback(payload);
            }
            Some(StreamEvent::Token {
                text: payload.to_string(),
            })
        }
    }
}

fn decode_record(record: WireRecord, raw: &str) -> StreamEvent {
    match record.kind.as_deref() {
        Some("recommendation") => StreamEvent::Recommendation {
            ready: has_recommendation_content(&record.content),
        },
        Some("signal") => match record.content.as_str() {
            Some("finish") => StreamEvent::Done,
            Some(signal) => StreamEvent::Status {
                code: signal_status_code(signal),
            },
            None => StreamEvent::Token {
                text: raw.to_string(),
            },
        },
        _ => match record.content {
            Value::String(text) => StreamEvent::Token { text },
            _ => StreamEvent::Token {
                text: raw.to_string(),
            },
        },
    }
}

/// An empty recommendation record must not flip the ready latch. The
/// backend sends a movie-id list; older builds sent a string.
fn has_recommendation_content(content: &Value) -> bool {
    match content {
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn signal_status_code(signal: &str) -> u8 {
    match signal {
        "crawling start" => STATUS_SEARCHING,
        "message start" => STATUS_PREPARING,
        "database start" => STATUS_DATABASE,
        "crawling end" | "database end" | "message end" => STATUS_ORGANIZING,
        _ => STATUS_PREPARING,
    }
}
