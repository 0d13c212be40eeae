mod api;
mod events;

pub use api::{ChatTurn, Chatroom, MessageRequest, MovieSummary};
pub use events::{
    ErrorKind, StreamEvent, STATUS_DATABASE, STATUS_ERROR, STATUS_NONE, STATUS_ORGANIZING,
    STATUS_PREPARING, STATUS_SEARCHING,
};
