use std::time::Duration;

use candela_mock::{EdgeMode, MockBehavior};

use crate::helpers::{feed, minute_history, mock, wait_until};

#[tokio::test(start_paused = true)]
async fn stop_cancels_backfill_and_waits_for_tasks() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    // first poll succeeds, the backfill page then stalls
    ctl.script_next(MockBehavior::Return(())).await;
    ctl.hang_next().await;
    let feed = feed(connector, 5);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, |f| f.len() == 1).await;
    assert!(!handle.is_finished());

    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop returns once every task observed the signal");

    let seen = ctl.requests().await.len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ctl.requests().await.len(), seen);
    assert_eq!(feed.timestamps(), vec![540]);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_polling() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    let feed = feed(connector, 3);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    drop(handle);
    tokio::task::yield_now().await;

    let seen = ctl.requests().await.len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ctl.requests().await.len(), seen);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_aborts_stalled_backfill() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    ctl.script_next(MockBehavior::Return(())).await;
    ctl.hang_next().await;
    let feed = feed(connector, 5);
    let handle = feed.start().await.unwrap();

    wait_until(&feed, |f| f.len() == 1).await;
    drop(handle);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(feed.len(), 1);
    assert_eq!(ctl.history_requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn feed_can_restart_after_stop() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    let feed = feed(connector, 3);

    let handle = feed.start().await.unwrap();
    wait_until(&feed, candela::CandlesFeed::is_ready).await;
    handle.stop().await;

    ctl.publish(crate::helpers::flat(600, 1)).await;
    let handle = feed.start().await.unwrap();
    wait_until(&feed, |f| f.latest().is_some_and(|c| c.timestamp == 600)).await;
    assert_eq!(feed.timestamps(), vec![480, 540, 600]);
    handle.stop().await;
}
