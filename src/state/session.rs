use crate::api::{RequestHandle, StreamSignal, StreamUpdate};
use crate::types::{ErrorKind, StreamEvent, STATUS_ERROR, STATUS_NONE, STATUS_PREPARING};

use super::queue::TokenQueue;

/// Where the active room's interaction currently is.
///
/// `Sending` and `Streaming` are both "busy"; the split only matters for
/// UI affordance, since `Sending` is the instant before the first byte lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Streaming,
    Error,
}

/// Cache refreshes requested when a send completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Transcript(u64),
    Recommendations(u64),
    ChatroomList,
}

/// Streaming state for one chat room. Exactly one session exists per
/// active room; switching rooms tears it down and builds a fresh one, so
/// no state can leak across rooms.
pub struct Session {
    room_id: u64,
    phase: Phase,
    pending_user_text: String,
    visible_assistant_text: String,
    server_status: u8,
    recommendations_ready: bool,
    last_error: Option<ErrorKind>,
    stream_done: bool,
    active_stream: Option<u64>,
    queue: TokenQueue,
    handle: Option<RequestHandle>,
}

impl Session {
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            phase: Phase::Idle,
            pending_user_text: String::new(),
            visible_assistant_text: String::new(),
            server_status: STATUS_NONE,
            recommendations_ready: false,
            last_error: None,
            stream_done: false,
            active_stream: None,
            queue: TokenQueue::new(),
            handle: None,
        }
    }

    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_user_text(&self) -> &str {
        &self.pending_user_text
    }

    pub fn visible_assistant_text(&self) -> &str {
        &self.visible_assistant_text
    }

    pub fn server_status(&self) -> u8 {
        self.server_status
    }

    pub fn recommendations_ready(&self) -> bool {
        self.recommendations_ready
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn queue_mut(&mut self) -> &mut TokenQueue {
        &mut self.queue
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Sending | Phase::Streaming)
    }

    /// The animator keeps ticking while streaming or while anything is
    /// still buffered, so every token reaches the screen even after the
    /// network stream itself has ended.
    pub fn needs_animation(&self) -> bool {
        matches!(self.phase, Phase::Streaming) || !self.queue.is_empty()
    }

    /// A send is accepted from `Idle`, or from `Error` where it doubles
    /// as dismissal. While busy it is a silent no-op: not queued, not an
    /// error.
    pub fn can_submit(&self, text: &str) -> bool {
        !text.trim().is_empty() && matches!(self.phase, Phase::Idle | Phase::Error)
    }

    /// Enters `Sending` for an accepted submit. The caller has already
    /// opened the stream; `stream_id` is the generation all updates from
    /// it will carry.
    pub fn begin_send(&mut self, text: String, stream_id: u64, handle: RequestHandle) {
        self.cancel();
        self.phase = Phase::Sending;
        self.pending_user_text = text;
        self.visible_assistant_text.clear();
        self.queue.clear();
        self.server_status = STATUS_PREPARING;
        self.last_error = None;
        self.stream_done = false;
        self.active_stream = Some(stream_id);
        self.handle = Some(handle);
    }

    /// Routes one update from the reader. Updates from any stream other
    /// than the active generation are dropped; they belong to a send
    /// that was abandoned.
    pub fn apply(&mut self, update: StreamUpdate) {
        if Some(update.stream_id) != self.active_stream || !self.is_busy() {
            return;
        }

        match update.signal {
            StreamSignal::Event(StreamEvent::Token { text }) => {
                self.phase = Phase::Streaming;
                self.queue.push(text);
            }
            StreamSignal::Event(StreamEvent::Status { code }) => {
                self.phase = Phase::Streaming;
                self.server_status = code;
            }
            StreamSignal::Event(StreamEvent::Recommendation { ready }) => {
                if ready {
                    self.recommendations_ready = true;
                }
            }
            StreamSignal::Event(StreamEvent::Done) | StreamSignal::Done => {
                self.stream_done = true;
            }
            StreamSignal::Failed(kind) => self.fail(kind),
        }
    }

    /// Completes the session once the stream has ended and the animator
    /// has flushed the queue. Returns the cache refreshes to request.
    /// The visible text is intentionally left in place; it is cleared
    /// when the refreshed transcript arrives, so the reply never blinks
    /// out before durable history replaces it.
    pub fn try_finalize(&mut self) -> Option<Vec<Invalidation>> {
        if !self.stream_done || !self.queue.is_empty() || !self.is_busy() {
            return None;
        }

        self.phase = Phase::Idle;
        self.pending_user_text.clear();
        self.server_status = STATUS_NONE;
        self.stream_done = false;
        self.active_stream = None;
        self.handle = None;

        Some(vec![
            Invalidation::Transcript(self.room_id),
            Invalidation::Recommendations(self.room_id),
            Invalidation::ChatroomList,
        ])
    }

    pub fn fail(&mut self, kind: ErrorKind) {
        self.phase = Phase::Error;
        self.pending_user_text.clear();
        self.visible_assistant_text.clear();
        self.queue.clear();
        self.server_status = STATUS_ERROR;
        self.last_error = Some(kind);
        self.stream_done = false;
        self.active_stream = None;
        self.handle = None;
    }

    pub fn dismiss_error(&mut self) {
        if self.phase == Phase::Error {
            self.phase = Phase::Idle;
            self.server_status = STATUS_NONE;
            self.last_error = None;
        }
    }

    /// Latch cleared only by an explicit user dismissal.
    pub fn dismiss_recommendations(&mut self) {
        self.recommendations_ready = false;
    }

    pub fn append_visible(&mut self, text: &str) {
        self.visible_assistant_text.push_str(text);
    }

    /// Drops the finished reply once the durable transcript covers it.
    pub fn clear_visible(&mut self) {
        self.visible_assistant_text.clear();
    }

    /// Silently abandons any in-flight stream. This is the room-change
    /// path; it never reports an error.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        self.active_stream = None;
    }
}
