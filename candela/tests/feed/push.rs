use std::sync::Arc;
use std::time::Duration;

use candela::{CandlesError, CandlesRequest};
use candela_mock::{MockBehavior, MockConnector, MockPushChannel};
use serde_json::json;

use crate::helpers::{flat, minute_history, push_feed, wait_until};

fn streaming_mock(
    streams_candles: bool,
) -> (Arc<MockConnector>, candela_mock::MockController) {
    MockConnector::builder()
        .with_push(streams_candles)
        .history(minute_history(10))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn start_connects_and_subscribes_before_streaming() {
    let (connector, ctl) = streaming_mock(true);
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 5);

    let handle = feed.start().await.unwrap();
    assert!(channel.is_connected());
    assert_eq!(
        channel.sent(),
        vec![json!({
            "type": "subscribe",
            "channel": "candles",
            "id": "BTC-USD",
            "resolution": "1MIN",
        })]
    );

    assert!(channel.deliver(MockConnector::candle_message(&flat(540, 9))));
    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert_eq!(feed.timestamps(), vec![300, 360, 420, 480, 540]);
    assert!(
        ctl.requests().await.iter().all(|r| r.end_time.is_some()),
        "a streaming feed never polls"
    );

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn pushed_messages_merge_and_noise_is_ignored() {
    let (connector, _ctl) = streaming_mock(true);
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 5);
    let handle = feed.start().await.unwrap();

    channel.deliver(MockConnector::candle_message(&flat(540, 9)));
    wait_until(&feed, candela::CandlesFeed::is_ready).await;

    channel.deliver(json!({ "type": "connected", "id": "abc" }));
    channel.deliver(json!({
        "type": "channel_data",
        "contents": { "candle": { "t": 600, "o": "x", "h": "1", "l": "1", "c": "1" } }
    }));
    channel.deliver(MockConnector::candle_message(&flat(480, 1)));
    channel.deliver(MockConnector::candle_message(&flat(600, 11)));
    wait_until(&feed, |f| f.latest().is_some_and(|c| c.timestamp == 600)).await;

    assert_eq!(feed.timestamps(), vec![360, 420, 480, 540, 600]);
    assert_eq!(feed.latest().unwrap().close, candela::Decimal::from(11));
    // the stale 480 observation did not overwrite history
    assert_eq!(feed.candles()[2].close, candela::Decimal::from(108));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn subscribe_failure_fails_start() {
    let (connector, ctl) = streaming_mock(true);
    ctl.set_subscribe(MockBehavior::Fail(CandlesError::transport(
        "mock",
        "handshake rejected",
    )))
    .await;
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 5);

    let err = feed.start().await.unwrap_err();
    assert!(matches!(err, CandlesError::Transport { .. }));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(ctl.requests().await.is_empty());
    assert!(feed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_subscription_send_fails_start() {
    let (connector, _ctl) = streaming_mock(true);
    let channel = Arc::new(MockPushChannel::new());
    channel.fail_sends(true);
    let feed = push_feed(connector, Arc::clone(&channel), 5);

    assert!(feed.start().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn subscription_without_candles_keeps_polling() {
    let (connector, ctl) = streaming_mock(false);
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 3);

    let handle = feed.start().await.unwrap();
    assert_eq!(channel.sent().len(), 1);

    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert!(ctl.requests().await.contains(&CandlesRequest::latest(1)));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn closed_channel_falls_back_to_polling() {
    let (connector, ctl) = streaming_mock(true);
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 3);
    let handle = feed.start().await.unwrap();

    channel.close();
    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert_eq!(feed.timestamps(), vec![420, 480, 540]);
    assert!(ctl.requests().await.contains(&CandlesRequest::latest(1)));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn channel_is_ignored_without_push_source() {
    let (connector, _ctl) = MockConnector::builder()
        .history(minute_history(10))
        .build()
        .unwrap();
    let channel = Arc::new(MockPushChannel::new());
    let feed = push_feed(connector, Arc::clone(&channel), 3);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert!(!channel.is_connected());
    assert!(channel.sent().is_empty());

    handle.stop().await;
}
