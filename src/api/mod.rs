pub mod client;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod reader;
pub mod stream;

pub use client::{ApiClient, ByteStream};
pub use reader::{RequestHandle, StreamReader, StreamSignal, StreamUpdate};
pub use stream::StreamDecoder;
