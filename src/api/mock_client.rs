use crate::api::client::{ByteStream, MockStreamProducer};
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Scripted stream source for tests. Responses are consumed in order, one
/// per opened stream.
#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
}

#[derive(Clone)]
pub enum MockResponse {
    /// Whole records; each gets "\n" framing appended when missing.
    Records(Vec<String>),
    /// Raw byte chunks passed through untouched.
    RawChunks(Vec<Vec<u8>>),
    /// Simulates a rejected connection (HTTP error before any body).
    ConnectionRefused,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    pub fn with_records(records: Vec<&str>) -> Self {
        Self::new(vec![MockResponse::Records(
            records.into_iter().map(str::to_string).collect(),
        )])
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, _room_id: u64, _content: &str) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockApiClient: no more responses configured"
            ));
        }

        match responses_guard.remove(0) {
            MockResponse::ConnectionRefused => {
                Err(anyhow::anyhow!("mock backend refused the connection"))
            }
            MockResponse::Records(records) => {
                let chunks: Vec<Result<Bytes>> = records
                    .into_iter()
                    .map(|record| {
                        let framed = if record.ends_with('\n') {
                            record
                        } else {
                            format!("{record}\n")
                        };
                        Ok(Bytes::from(framed))
                    })
                    .collect();
                Ok(Box::pin(stream::iter(chunks)))
            }
            MockResponse::RawChunks(chunks) => {
                let chunks: Vec<Result<Bytes>> =
                    chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                Ok(Box::pin(stream::iter(chunks)))
            }
        }
    }
}
