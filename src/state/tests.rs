//! Full-loop tests: a scripted server reply flows through the stream
//! reader into a session, and the animator drains it to visible text.

use super::session::{Invalidation, Phase, Session};
use super::typing::TypingAnimator;
use crate::api::mock_client::{MockApiClient, MockResponse};
use crate::api::{ApiClient, StreamReader, StreamUpdate};
use crate::types::{ErrorKind, STATUS_NONE, STATUS_SEARCHING};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn instant_delay() -> Duration {
    Duration::ZERO
}

/// Opens a stream against the scripted client and feeds every update to
/// the session as the event loop would.
async fn stream_into(
    session: &mut Session,
    client: ApiClient,
    content: &str,
    stream_id: u64,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamUpdate>();
    let handle = StreamReader::open(
        client,
        session.room_id(),
        content.to_string(),
        stream_id,
        tx,
    );
    session.begin_send(content.to_string(), stream_id, handle);

    while let Ok(Some(update)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        session.apply(update);
    }
}

/// Runs animation ticks until the queue is empty, appending each batch.
fn drain_with_animator(session: &mut Session) {
    let mut animator = TypingAnimator::with_sampler(3, instant_delay);
    let mut now = Instant::now();
    while !session.queue_mut().is_empty() {
        if let Some(batch) = animator.poll(now, session.queue_mut()) {
            session.append_visible(&batch);
        }
        now += Duration::from_millis(16);
    }
}

#[tokio::test]
async fn test_reply_streams_to_completion() {
    let mock = Arc::new(MockApiClient::with_records(vec![
        r#"data: {"type":"signal","content":"crawling start"}"#,
        r#"data: {"type":"message","content":"Hi"}"#,
        r#"data: {"type":"recommendation","content":[]}"#,
        r#"data: {"type":"message","content":"there"}"#,
        "data: [DONE]",
    ]));
    let client = ApiClient::new_mock(mock);
    let mut session = Session::new(7);

    stream_into(&mut session, client, "suggest a movie", 1).await;
    assert_eq!(session.phase(), Phase::Streaming);
    assert_eq!(session.server_status(), STATUS_SEARCHING);
    assert!(session.try_finalize().is_none());

    drain_with_animator(&mut session);
    let invalidations = session.try_finalize().expect("stream done, queue drained");

    assert_eq!(session.visible_assistant_text(), "Hithere");
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.server_status(), STATUS_NONE);
    // An empty recommendation record never arms the indicator.
    assert!(!session.recommendations_ready());
    assert_eq!(
        invalidations,
        vec![
            Invalidation::Transcript(7),
            Invalidation::Recommendations(7),
            Invalidation::ChatroomList,
        ]
    );
}

#[tokio::test]
async fn test_populated_recommendation_arms_the_indicator() {
    let mock = Arc::new(MockApiClient::with_records(vec![
        r#"data: {"type":"message","content":"Try this one."}"#,
        r#"data: {"type":"recommendation","content":[101,102]}"#,
        "data: [DONE]",
    ]));
    let client = ApiClient::new_mock(mock);
    let mut session = Session::new(7);

    stream_into(&mut session, client, "anything good?", 1).await;
    drain_with_animator(&mut session);
    session.try_finalize().expect("stream completed");

    assert!(session.recommendations_ready());
    assert_eq!(session.visible_assistant_text(), "Try this one.");
}

#[tokio::test]
async fn test_unreachable_server_surfaces_a_retryable_error() {
    let mock = Arc::new(MockApiClient::new(vec![MockResponse::ConnectionRefused]));
    let client = ApiClient::new_mock(mock);
    let mut session = Session::new(7);

    stream_into(&mut session, client, "hello?", 1).await;

    assert_eq!(session.phase(), Phase::Error);
    assert_eq!(session.last_error(), Some(ErrorKind::ConnectionFailed));
    assert_eq!(session.pending_user_text(), "");
    assert_eq!(session.visible_assistant_text(), "");
    assert!(session.queue_mut().is_empty());
    // The user can immediately try again.
    assert!(session.can_submit("hello again"));
}

#[tokio::test]
async fn test_room_switch_discards_the_old_stream() {
    let mock = Arc::new(MockApiClient::with_records(vec![
        r#"data: {"type":"message","content":"for room one"}"#,
        "data: [DONE]",
    ]));
    let client = ApiClient::new_mock(mock);

    let (tx, mut rx) = mpsc::unbounded_channel::<StreamUpdate>();
    let mut session = Session::new(1);
    let handle = StreamReader::open(client, 1, "old question".to_string(), 5, tx);
    session.begin_send("old question".to_string(), 5, handle);

    // Room switch: tear the session down before its updates are routed.
    session.cancel();
    let mut session = Session::new(2);

    while let Ok(Some(update)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        session.apply(update);
    }

    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.queue_mut().is_empty());
    assert_eq!(session.visible_assistant_text(), "");
    assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn test_no_second_send_while_streaming() {
    let mock = Arc::new(MockApiClient::with_records(vec![
        r#"data: {"type":"message","content":"slow reply"}"#,
        "data: [DONE]",
    ]));
    let client = ApiClient::new_mock(mock);
    let mut session = Session::new(7);

    stream_into(&mut session, client, "first", 1).await;

    // Stream is done but tokens are still animating out; still busy.
    assert_eq!(session.phase(), Phase::Streaming);
    assert!(!session.can_submit("second"));

    drain_with_animator(&mut session);
    session.try_finalize().expect("drained");
    assert!(session.can_submit("second"));
}

#[tokio::test]
async fn test_chunk_fragmentation_changes_nothing() {
    let framed = concat!(
        "data: {\"type\":\"message\",\"content\":\"He\u{300}llo\"}\n",
        "data: {\"type\":\"message\",\"content\":\" world\"}\n",
        "data: [DONE]\n",
    )
    .as_bytes();
    // Every byte in its own network chunk, multibyte content included.
    let chunks: Vec<Vec<u8>> = framed.iter().map(|b| vec![*b]).collect();

    let mock = Arc::new(MockApiClient::new(vec![MockResponse::RawChunks(chunks)]));
    let client = ApiClient::new_mock(mock);
    let mut session = Session::new(7);

    stream_into(&mut session, client, "hi", 1).await;
    drain_with_animator(&mut session);
    session.try_finalize().expect("drained");

    assert_eq!(session.visible_assistant_text(), "He\u{300}llo world");
}
