use std::time::Duration;

use candela::{CandlesError, CandlesFeed, CandlesRequest, FeedConfig, MergeOutcome};
use candela_mock::{EdgeMode, MockBehavior};
use tokio::sync::watch;

use crate::helpers::{PAIR, feed, flat, minute_history, mock};

#[tokio::test]
async fn overlapping_pages_fill_window_in_two_requests() {
    let history: Vec<_> = (0..=10).map(|i| flat(i * 10, 100 + i)).collect();
    let (connector, ctl) = mock(2, EdgeMode::Overlap, history);
    let feed = feed(connector, 5);
    assert_eq!(feed.backfill_budget(), 4);

    assert_eq!(feed.merge_observation(flat(100, 110)), MergeOutcome::Initialized);
    let (_stop_tx, mut stop) = watch::channel(false);
    let added = feed.fill_historical_candles(&mut stop).await.unwrap();

    assert_eq!(added, 4);
    assert!(feed.is_ready());
    assert_eq!(feed.timestamps(), vec![60, 70, 80, 90, 100]);
    assert_eq!(
        ctl.history_requests().await,
        vec![
            CandlesRequest::ending_at(100, 2),
            CandlesRequest::ending_at(80, 2),
        ]
    );

    let outcome = feed.merge_observation(flat(110, 111));
    assert_eq!(outcome, MergeOutcome::Appended { evicted: Some(60) });
    assert_eq!(feed.timestamps(), vec![70, 80, 90, 100, 110]);
}

#[tokio::test]
async fn inclusive_pages_converge_within_budget() {
    let history: Vec<_> = (0..=10).map(|i| flat(i * 10, 100 + i)).collect();
    let (connector, ctl) = mock(2, EdgeMode::Inclusive, history);
    let feed = feed(connector, 5);

    feed.merge_observation(flat(100, 110));
    let (_stop_tx, mut stop) = watch::channel(false);
    feed.fill_historical_candles(&mut stop).await.unwrap();

    assert_eq!(feed.timestamps(), vec![60, 70, 80, 90, 100]);
    assert!(ctl.history_requests().await.len() <= feed.backfill_budget());
}

#[tokio::test]
async fn exclusive_pages_fill_with_full_pages() {
    let (connector, ctl) = mock(100, EdgeMode::Exclusive, minute_history(400));
    let feed = feed(connector, 250);

    feed.merge_observation(flat(399 * 60, 1));
    let (_stop_tx, mut stop) = watch::channel(false);
    let added = feed.fill_historical_candles(&mut stop).await.unwrap();

    assert_eq!(added, 249);
    let ts = feed.timestamps();
    assert_eq!(ts.len(), 250);
    assert_eq!(ts.first(), Some(&(150 * 60)));
    assert!(ts.windows(2).all(|w| w[1] - w[0] == 60));
    assert_eq!(ctl.history_requests().await.len(), 3);
}

#[tokio::test]
async fn short_history_reports_insufficient_after_budget() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(3));
    let feed = feed(connector, 10);
    assert_eq!(feed.backfill_budget(), 2);

    feed.merge_observation(flat(120, 1));
    let (_stop_tx, mut stop) = watch::channel(false);
    let err = feed.fill_historical_candles(&mut stop).await.unwrap_err();

    assert_eq!(err, CandlesError::InsufficientHistory { have: 3, wanted: 10 });
    assert_eq!(ctl.history_requests().await.len(), 2);
    assert!(!feed.is_ready());
    assert_eq!(feed.timestamps(), vec![0, 60, 120]);
}

#[tokio::test]
async fn full_window_needs_no_requests() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(3));
    let feed = feed(connector, 1);

    feed.merge_observation(flat(120, 1));
    let (_stop_tx, mut stop) = watch::channel(false);
    assert_eq!(feed.fill_historical_candles(&mut stop).await.unwrap(), 0);
    assert!(ctl.requests().await.is_empty());
}

#[tokio::test]
async fn empty_window_is_seeded_from_latest_page() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    let feed = feed(connector, 5);

    let (_stop_tx, mut stop) = watch::channel(false);
    feed.fill_historical_candles(&mut stop).await.unwrap();

    assert_eq!(feed.timestamps(), vec![300, 360, 420, 480, 540]);
    assert_eq!(ctl.requests().await, vec![CandlesRequest::latest(5)]);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_are_retried_after_delay() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(5));
    ctl.fail_next(CandlesError::transport("mock", "connection reset"))
        .await;
    ctl.fail_next(CandlesError::malformed("bad close")).await;
    let feed = feed(connector, 3);

    feed.merge_observation(flat(240, 1));
    let started = tokio::time::Instant::now();
    let (_stop_tx, mut stop) = watch::channel(false);
    let added = feed.fill_historical_candles(&mut stop).await.unwrap();

    assert_eq!(added, 2);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(ctl.requests().await.len(), 3);
    assert_eq!(feed.timestamps(), vec![120, 180, 240]);
}

#[tokio::test]
async fn non_retryable_errors_end_backfill() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(5));
    ctl.fail_next(CandlesError::unsupported("history")).await;
    let feed = feed(connector, 3);

    feed.merge_observation(flat(240, 1));
    let (_stop_tx, mut stop) = watch::channel(false);
    let err = feed.fill_historical_candles(&mut stop).await.unwrap_err();
    assert!(matches!(err, CandlesError::Unsupported { .. }));
    assert_eq!(feed.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_stalled_fetch() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(5));
    ctl.hang_next().await;
    let feed = feed(connector, 3);
    feed.merge_observation(flat(240, 1));

    let (stop_tx, stop) = watch::channel(false);
    let runner = feed.clone();
    let task = tokio::spawn(async move {
        let mut stop = stop;
        runner.fill_historical_candles(&mut stop).await
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    stop_tx.send(true).unwrap();
    let res = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("backfill returns promptly")
        .unwrap();
    assert_eq!(res, Err(CandlesError::Cancelled));
    assert_eq!(feed.timestamps(), vec![240]);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_retry_wait() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(5));
    ctl.fail_next(CandlesError::transport("mock", "timeout")).await;
    let feed = CandlesFeed::builder()
        .connector(connector)
        .config(FeedConfig::new(PAIR, "1m", 3))
        .retry_delay(Duration::from_secs(60))
        .build()
        .unwrap();
    feed.merge_observation(flat(240, 1));

    let (stop_tx, stop) = watch::channel(false);
    let runner = feed.clone();
    let started = tokio::time::Instant::now();
    let task = tokio::spawn(async move {
        let mut stop = stop;
        runner.fill_historical_candles(&mut stop).await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    stop_tx.send(true).unwrap();
    assert_eq!(task.await.unwrap(), Err(CandlesError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(ctl.requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn live_append_during_backfill_keeps_series_ordered() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    ctl.fail_next(CandlesError::transport("mock", "reset")).await;
    let feed = feed(connector, 4);
    feed.merge_observation(flat(300, 1));

    let (_stop_tx, stop) = watch::channel(false);
    let runner = feed.clone();
    let task = tokio::spawn(async move {
        let mut stop = stop;
        runner.fill_historical_candles(&mut stop).await
    });

    // backfill is now waiting out its retry delay
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        feed.merge_observation(flat(360, 2)),
        MergeOutcome::Appended { evicted: None }
    );

    task.await.unwrap().unwrap();
    assert_eq!(feed.timestamps(), vec![180, 240, 300, 360]);
    assert_eq!(
        ctl.requests().await,
        vec![
            CandlesRequest::ending_at(300, 4),
            CandlesRequest::ending_at(300, 3),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn clear_during_backfill_discards_stale_page() {
    let history: Vec<_> = (0..=20).map(|i| flat(i * 10, 100 + i)).collect();
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, history);
    ctl.script_next(MockBehavior::Delay(Duration::from_secs(1)))
        .await;
    let feed = feed(connector, 5);
    feed.merge_observation(flat(100, 110));

    let (_stop_tx, stop) = watch::channel(false);
    let runner = feed.clone();
    let task = tokio::spawn(async move {
        let mut stop = stop;
        runner.fill_historical_candles(&mut stop).await
    });

    // the page ending at 100 is in flight
    tokio::time::sleep(Duration::from_millis(500)).await;
    feed.clear();
    assert_eq!(
        feed.merge_observation(flat(200, 120)),
        MergeOutcome::Initialized
    );

    assert_eq!(task.await.unwrap(), Err(CandlesError::Cancelled));
    assert_eq!(feed.timestamps(), vec![200]);
    assert!(!feed.is_ready());
    assert_eq!(ctl.history_requests().await, vec![CandlesRequest::ending_at(100, 5)]);

    let (_stop_tx, mut stop) = watch::channel(false);
    feed.fill_historical_candles(&mut stop).await.unwrap();
    assert_eq!(feed.timestamps(), vec![160, 170, 180, 190, 200]);
}

#[tokio::test(start_paused = true)]
async fn page_is_refetched_when_oldest_edge_moves() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(10));
    ctl.script_next(MockBehavior::Delay(Duration::from_secs(1)))
        .await;
    let feed = feed(connector, 5);

    let (_stop_tx, stop) = watch::channel(false);
    let runner = feed.clone();
    let task = tokio::spawn(async move {
        let mut stop = stop;
        runner.fill_historical_candles(&mut stop).await
    });

    // the seeding page is in flight when a live candle lands
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        feed.merge_observation(flat(600, 1)),
        MergeOutcome::Initialized
    );

    assert_eq!(task.await.unwrap(), Ok(4));
    assert_eq!(feed.timestamps(), vec![360, 420, 480, 540, 600]);
    assert_eq!(
        ctl.requests().await,
        vec![CandlesRequest::latest(5), CandlesRequest::ending_at(600, 5)]
    );
}
