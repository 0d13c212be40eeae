use super::client::ApiClient;
use super::stream::StreamDecoder;
use crate::types::{ErrorKind, StreamEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One signal from an in-flight stream. A stream emits any number of
/// `Event`s followed by exactly one of `Done` or `Failed`, or nothing
/// further at all if it was cancelled first.
#[derive(Debug)]
pub enum StreamSignal {
    Event(StreamEvent),
    Done,
    Failed(ErrorKind),
}

/// Channel payload tagged with the stream generation that produced it.
/// Updates already queued when a room switches away carry a stale id and
/// are dropped by the session instead of leaking into the next room.
#[derive(Debug)]
pub struct StreamUpdate {
    pub stream_id: u64,
    pub signal: StreamSignal,
}

/// Cancels the read loop at its next await point. Cancelling twice, or
/// after the stream already finished, is a no-op.
pub struct RequestHandle {
    cancel: CancellationToken,
}

impl RequestHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct StreamReader;

impl StreamReader {
    /// Issues the message request on a spawned task and forwards decoded
    /// events over `update_tx`. Returns immediately with the handle that
    /// owns cancellation.
    pub fn open(
        client: ApiClient,
        room_id: u64,
        content: String,
        stream_id: u64,
        update_tx: mpsc::UnboundedSender<StreamUpdate>,
    ) -> RequestHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            pump(client, room_id, content, stream_id, token, update_tx).await;
        });
        RequestHandle { cancel }
    }
}

async fn pump(
    client: ApiClient,
    room_id: u64,
    content: String,
    stream_id: u64,
    cancel: CancellationToken,
    update_tx: mpsc::UnboundedSender<StreamUpdate>,
) {
    let send = |signal: StreamSignal| {
        let _ = update_tx.send(StreamUpdate { stream_id, signal });
    };

    // The biased arms make cancellation win every race with ready I/O, so
    // no signal is emitted once cancel() has been observed.
    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = client.open_message_stream(room_id, &content) => match opened {
            Ok(stream) => stream,
            Err(_) => {
                send(StreamSignal::Failed(ErrorKind::ConnectionFailed));
                return;
            }
        },
    };

    let mut decoder = StreamDecoder::new();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            chunk = stream.next() => chunk,
        };

        match chunk {
            None => {
                send(StreamSignal::Done);
                return;
            }
            Some(Err(_)) => {
                send(StreamSignal::Failed(ErrorKind::StreamReadFailed));
                return;
            }
            Some(Ok(bytes)) => {
                for event in decoder.feed(&bytes) {
                    if matches!(event, StreamEvent::Done) {
                        send(StreamSignal::Done);
                        return;
                    }
                    send(StreamSignal::Event(event));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{MockApiClient, MockResponse};
    use std::sync::Arc;
    use std::time::Duration;

    async fn collect_signals(mut rx: mpsc::UnboundedReceiver<StreamUpdate>) -> Vec<StreamUpdate> {
        let mut updates = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
                Ok(Some(update)) => {
                    let terminal =
                        matches!(update.signal, StreamSignal::Done | StreamSignal::Failed(_));
                    updates.push(update);
                    if terminal {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => panic!("stream never produced a terminal signal"),
            }
        }
        updates
    }

    #[tokio::test]
    async fn test_reader_forwards_events_then_done() {
        let mock = Arc::new(MockApiClient::with_records(vec![
            r#"data: {"type":"message","content":"Hi"}"#,
            r#"data: {"type":"message","content":" there"}"#,
            "data: [DONE]",
        ]));
        let client = ApiClient::new_mock(mock);
        let (tx, rx) = mpsc::unbounded_channel();

        let _handle = StreamReader::open(client, 42, "hello".to_string(), 7, tx);
        let updates = collect_signals(rx).await;

        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.stream_id == 7));
        assert!(matches!(
            &updates[0].signal,
            StreamSignal::Event(StreamEvent::Token { text }) if text == "Hi"
        ));
        assert!(matches!(&updates[2].signal, StreamSignal::Done));
    }

    #[tokio::test]
    async fn test_done_record_suppresses_trailing_events() {
        let mock = Arc::new(MockApiClient::with_records(vec![
            r#"data: {"type":"message","content":"kept"}"#,
            "data: [DONE]",
            r#"data: {"type":"message","content":"dropped"}"#,
        ]));
        let client = ApiClient::new_mock(mock);
        let (tx, rx) = mpsc::unbounded_channel();

        let _handle = StreamReader::open(client, 42, "hello".to_string(), 1, tx);
        let updates = collect_signals(rx).await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(&updates[1].signal, StreamSignal::Done));
    }

    #[tokio::test]
    async fn test_end_of_body_without_sentinel_is_done() {
        let mock = Arc::new(MockApiClient::with_records(vec![
            r#"data: {"type":"message","content":"partial"}"#,
        ]));
        let client = ApiClient::new_mock(mock);
        let (tx, rx) = mpsc::unbounded_channel();

        let _handle = StreamReader::open(client, 42, "hello".to_string(), 1, tx);
        let updates = collect_signals(rx).await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(&updates[1].signal, StreamSignal::Done));
    }

    #[tokio::test]
    async fn test_rejected_connection_fails_once() {
        let mock = Arc::new(MockApiClient::new(vec![MockResponse::ConnectionRefused]));
        let client = ApiClient::new_mock(mock);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _handle = StreamReader::open(client, 42, "hello".to_string(), 1, tx);

        let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("signal expected")
            .expect("channel open");
        assert!(matches!(
            update.signal,
            StreamSignal::Failed(ErrorKind::ConnectionFailed)
        ));
        // Sender side is dropped after the terminal signal.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_after_completion() {
        let mock = Arc::new(MockApiClient::with_records(vec!["data: [DONE]"]));
        let client = ApiClient::new_mock(mock);
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = StreamReader::open(client, 42, "hello".to_string(), 1, tx);
        let updates = collect_signals(rx).await;
        assert_eq!(updates.len(), 1);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
