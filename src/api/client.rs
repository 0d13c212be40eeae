use super::logging::{debug_stream_enabled, emit_request_debug};
use crate::config::Config;
use crate::types::{ChatTurn, Chatroom, MessageRequest, MovieSummary};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, room_id: u64, content: &str) -> Result<ByteStream>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8000/api".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    /// Opens the streaming message request for a room and returns the raw
    /// chunked body. Non-success statuses surface here as errors so the
    /// caller can treat the stream as connected once this returns Ok.
    pub async fn open_message_stream(&self, room_id: u64, content: &str) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(room_id, content);
            }
        }

        let request_url = format!("{}/chatrooms/{room_id}/messages?stream=true", self.base_url);
        let payload = MessageRequest {
            content: content.to_string(),
        };

        if debug_stream_enabled() {
            emit_request_debug(&request_url, &serde_json::to_value(&payload)?);
        }

        let response = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    pub async fn fetch_chatrooms(&self) -> Result<Vec<Chatroom>> {
        let request_url = format!("{}/chatrooms", self.base_url);
        self.get_json(&request_url).await
    }

    pub async fn fetch_history(&self, room_id: u64) -> Result<Vec<ChatTurn>> {
        let request_url = format!("{}/chatrooms/{room_id}/messages", self.base_url);
        self.get_json(&request_url).await
    }

    pub async fn fetch_recommendations(&self, room_id: u64) -> Result<Vec<MovieSummary>> {
        let request_url = format!("{}/chatrooms/{room_id}/recommended", self.base_url);
        self.get_json(&request_url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, request_url: &str) -> Result<T> {
        let response = self
            .http
            .get(request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, request_url))?;

        response
            .json::<T>()
            .await
            .map_err(|error| map_api_request_error(error, request_url))
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local backend '{}': {}. Start the backend or set REEL_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach backend '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!("backend '{}' returned HTTP {}: {}", request_url, status, error);
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
