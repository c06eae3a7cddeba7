//! Ingestion Pipeline Integration Tests
//!
//! Drives the session state machine and feed client end to end with a
//! recording sink, covering the handshake ordering, fan-out to
//! per-symbol channels, and publish failure isolation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Sink;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use polygon_stream_relay::infrastructure::polygon::session::{
    ConnectionState, FeedSession, SessionAction, SessionEvent,
};
use polygon_stream_relay::{
    BackoffConfig, FeedClient, FeedClientConfig, MessageSink, StreamMessage, Watchlist,
    WorkerCounters,
};

/// Records every published message; can be switched to fail.
#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(String, StreamMessage)>>,
    fail: AtomicBool,
}

impl RecordingSink {
    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn published(&self) -> Vec<(String, StreamMessage)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn publish(&self, symbol: &str, message: &StreamMessage) -> bool {
        if self.fail.load(Ordering::SeqCst) {
            return false;
        }
        self.published
            .lock()
            .push((symbol.to_string(), message.clone()));
        true
    }

    async fn close(&self) {}
}

/// Captures outbound WebSocket frames as JSON values.
#[derive(Default)]
struct CaptureWrite {
    sent: Vec<Value>,
}

impl Sink<Message> for CaptureWrite {
    type Error = std::convert::Infallible;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        if let Message::Text(text) = item {
            self.sent.push(serde_json::from_str(&text).unwrap());
        }
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

struct Harness {
    client: Arc<FeedClient>,
    sink: Arc<RecordingSink>,
    counters: Arc<WorkerCounters>,
    session: FeedSession,
    write: CaptureWrite,
}

fn harness(watchlist: &str) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let counters = Arc::new(WorkerCounters::new());
    let watchlist = Watchlist::parse(watchlist);
    let config = FeedClientConfig {
        url: "wss://example.invalid/stocks".to_string(),
        api_key: "integration-key".to_string(),
        watchlist: watchlist.clone(),
        backoff: BackoffConfig::default(),
    };
    let client = Arc::new(FeedClient::new(
        config,
        Arc::clone(&sink) as Arc<dyn MessageSink>,
        Arc::clone(&counters),
        CancellationToken::new(),
    ));
    let mut session = FeedSession::new(
        "integration-key".to_string(),
        watchlist,
        Arc::clone(&counters),
    );
    session.begin_connect();
    Harness {
        client,
        sink,
        counters,
        session,
        write: CaptureWrite::default(),
    }
}

impl Harness {
    fn open(&mut self) {
        for action in self.session.handle(SessionEvent::Opened) {
            match action {
                SessionAction::Send(request) => {
                    let json = request.to_json().unwrap();
                    self.write.sent.push(serde_json::from_str(&json).unwrap());
                }
                other => panic!("unexpected action on open: {other:?}"),
            }
        }
    }

    async fn feed(&mut self, payload: &str) {
        self.client
            .handle_text(&mut self.session, payload, &mut self.write)
            .await
            .unwrap();
    }

    async fn authenticate(&mut self) {
        self.feed(r#"[{"ev":"status","status":"connected"}]"#).await;
        self.feed(r#"[{"ev":"status","status":"auth_success"}]"#)
            .await;
        assert_eq!(self.session.state(), ConnectionState::Subscribed);
    }
}

#[tokio::test]
async fn handshake_orders_auth_before_subscriptions() {
    let mut h = harness("AAPL, msft , aapl");
    h.open();
    h.authenticate().await;

    assert_eq!(h.write.sent.len(), 3);
    assert_eq!(h.write.sent[0]["action"], "auth");
    assert_eq!(h.write.sent[0]["params"], "integration-key");
    // Watchlist is uppercased and deduplicated, order preserved.
    assert_eq!(h.write.sent[1]["action"], "subscribe");
    assert_eq!(h.write.sent[1]["params"], "T.AAPL,T.MSFT");
    assert_eq!(h.write.sent[2]["params"], "AM.AAPL,AM.MSFT");
}

#[tokio::test]
async fn trades_quotes_and_bars_fan_out_per_symbol() {
    let mut h = harness("AAPL,MSFT");
    h.open();
    h.authenticate().await;

    let batch = json!([
        {"ev": "T", "sym": "AAPL", "p": 189.5, "s": 100, "t": 1_700_000_000_001_i64},
        {"ev": "Q", "sym": "MSFT", "bp": 410.0, "bs": 2, "ap": 410.1, "as": 3,
         "t": 1_700_000_000_002_i64},
        {"ev": "AM", "sym": "AAPL", "o": 189.0, "h": 190.0, "l": 188.5, "c": 189.5,
         "v": 120_000, "vw": 189.2, "s": 1_700_000_000_000_i64},
    ]);
    h.feed(&batch.to_string()).await;

    let published = h.sink.published();
    assert_eq!(published.len(), 3);

    let (symbol, trade) = &published[0];
    assert_eq!(symbol, "AAPL");
    assert_eq!(trade.kind(), "trade");
    assert_eq!(trade.channel("marketdata"), "marketdata.AAPL");

    let (symbol, quote) = &published[1];
    assert_eq!(symbol, "MSFT");
    assert_eq!(quote.kind(), "quote");

    let (symbol, bar) = &published[2];
    assert_eq!(symbol, "AAPL");
    assert_eq!(bar.kind(), "bar");

    let wire = serde_json::to_value(trade).unwrap();
    assert_eq!(wire["type"], "trade");
    assert_eq!(wire["symbol"], "AAPL");
    assert_eq!(wire["data"]["price"], 189.5);
    assert_eq!(wire["data"]["size"], 100);

    assert_eq!(h.counters.message_count(), 3);
}

#[tokio::test]
async fn publish_failure_drops_message_and_keeps_ingesting() {
    let mut h = harness("AAPL");
    h.open();
    h.authenticate().await;

    h.sink.set_failing(true);
    h.feed(r#"[{"ev":"T","sym":"AAPL","p":1.0,"s":1,"t":1}]"#)
        .await;
    h.sink.set_failing(false);
    h.feed(r#"[{"ev":"T","sym":"AAPL","p":2.0,"s":2,"t":2}]"#)
        .await;

    // The failed message is gone, the next one still flows.
    let published = h.sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(h.counters.message_count(), 2);
    assert_eq!(h.counters.publish_failures(), 1);
    assert_eq!(h.session.state(), ConnectionState::Subscribed);
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_publishing() {
    let mut h = harness("AAPL");
    h.open();
    h.authenticate().await;

    h.feed("not json").await;
    h.feed(r#"[{"ev":"T","sym":"","p":1.0,"s":1,"t":1}]"#).await;
    h.feed(r#"[{"sym":"AAPL","p":1.0}]"#).await;
    h.feed(r#"[{"ev":"T","sym":"AAPL","p":"not a number","s":1,"t":1}]"#)
        .await;

    assert!(h.sink.published().is_empty());
    assert_eq!(h.counters.message_count(), 0);
    assert_eq!(h.session.state(), ConnectionState::Subscribed);
}

#[tokio::test]
async fn auth_failure_blocks_subscription_and_publishing() {
    let mut h = harness("AAPL");
    h.open();
    h.feed(r#"[{"ev":"status","status":"auth_failed","message":"invalid key"}]"#)
        .await;

    assert_eq!(h.session.state(), ConnectionState::Connected);
    // Only the auth request went out.
    assert_eq!(h.write.sent.len(), 1);
    assert!(!h.counters.is_authenticated());
}

#[tokio::test]
async fn close_and_reopen_replays_the_full_handshake() {
    let mut h = harness("AAPL");
    h.open();
    h.authenticate().await;
    h.counters.increment_reconnect_attempts();

    let _ = h.session.handle(SessionEvent::Closed);
    assert_eq!(h.session.state(), ConnectionState::Disconnected);
    assert!(!h.counters.is_connected());

    h.session.begin_connect();
    h.open();
    h.authenticate().await;

    // Auth, 2 subscribes, then again after the reconnect.
    assert_eq!(h.write.sent.len(), 6);
    assert_eq!(h.counters.reconnect_attempts(), 0);
}
