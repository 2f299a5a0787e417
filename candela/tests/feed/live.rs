use std::time::Duration;

use candela::{CandlesError, CandlesRequest, Decimal};
use candela_mock::EdgeMode;

use crate::helpers::{feed, flat, minute_history, mock, wait_until};

#[tokio::test(start_paused = true)]
async fn polling_seeds_backfills_and_tracks_newest() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    let feed = feed(connector, 5);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert_eq!(feed.timestamps(), vec![300, 360, 420, 480, 540]);
    assert_eq!(
        ctl.history_requests().await,
        vec![CandlesRequest::ending_at(540, 5)]
    );

    ctl.publish(flat(600, 7)).await;
    wait_until(&feed, |f| f.latest().is_some_and(|c| c.timestamp == 600)).await;
    assert_eq!(feed.timestamps(), vec![360, 420, 480, 540, 600]);

    // the in-progress bucket changes in place
    ctl.publish(flat(600, 8)).await;
    wait_until(&feed, |f| {
        f.latest().is_some_and(|c| c.close == Decimal::from(8))
    })
    .await;
    assert_eq!(feed.len(), 5);
    assert!(feed.is_ready());

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn poll_interval_paces_latest_requests() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(3));
    let feed = candela::CandlesFeed::builder()
        .connector(connector)
        .config(candela::FeedConfig::new(crate::helpers::PAIR, "1m", 3))
        .poll_interval(Duration::from_secs(10))
        .build()
        .unwrap();
    let handle = feed.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    let polls = ctl
        .requests()
        .await
        .into_iter()
        .filter(|r| *r == CandlesRequest::latest(1))
        .count();
    assert_eq!(polls, 4);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_poll_is_retried() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    ctl.fail_next(CandlesError::transport("mock", "connection refused"))
        .await;
    let feed = feed(connector, 3);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    assert_eq!(feed.timestamps(), vec![420, 480, 540]);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn non_retryable_poll_error_ends_live_loop() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    ctl.fail_next(CandlesError::unsupported("latest candle")).await;
    let feed = feed(connector, 3);
    let handle = feed.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.is_finished());
    assert!(feed.is_empty());
    assert_eq!(ctl.requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_backfill_leaves_live_updates_running() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(3));
    let feed = feed(connector, 10);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, |f| f.len() == 3).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ctl.history_requests().await.len(), feed.backfill_budget());
    assert!(!feed.is_ready());

    ctl.publish(flat(180, 1)).await;
    wait_until(&feed, |f| f.len() == 4).await;
    assert_eq!(feed.timestamps(), vec![0, 60, 120, 180]);
    assert!(!handle.is_finished());

    handle.stop().await;
}
