use std::fmt;

/// Progress codes shown in the status line. The backend announces phases
/// over the stream; `STATUS_NONE` means nothing in flight.
pub const STATUS_NONE: u8 = 0;
pub const STATUS_SEARCHING: u8 = 1;
pub const STATUS_PREPARING: u8 = 2;
pub const STATUS_DATABASE: u8 = 3;
pub const STATUS_ERROR: u8 = 4;
pub const STATUS_ORGANIZING: u8 = 5;

/// One decoded record from the message stream.
///
/// The wire shape is duck-typed JSON; decoding closes it into this union at
/// the boundary so nothing downstream probes object shapes. Payloads that
/// fail decoding degrade to `Token` with the raw text rather than being
/// dropped, because legitimate content can look like partial JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token { text: String },
    Status { code: u8 },
    Recommendation { ready: bool },
    Done,
}

/// Stream failure taxonomy surfaced to the session.
///
/// Cancellation is deliberately absent: an abandoned stream is silent, not
/// an error. Decode fallbacks are not errors either (see `StreamEvent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be established or the server rejected it.
    ConnectionFailed,
    /// The body read failed after a successful start.
    StreamReadFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConnectionFailed => write!(f, "could not reach the chat server"),
            ErrorKind::StreamReadFailed => write!(f, "the reply stream was interrupted"),
        }
    }
}
