use std::time::Duration;

use candela::{CandlesError, CandlesFeed, FeedConfig, NetworkStatus};
use candela_mock::{EdgeMode, MockBehavior, MockConnector};

use crate::helpers::{PAIR, feed, flat, minute_history, mock};

#[test]
fn build_requires_a_connector() {
    let err = CandlesFeed::builder()
        .config(FeedConfig::new(PAIR, "1m", 10))
        .build()
        .unwrap_err();
    assert!(matches!(err, CandlesError::InvalidConfig(_)));
}

#[test]
fn build_rejects_zero_capacity() {
    let (connector, _ctl) = MockConnector::new_with_controller().unwrap();
    let err = CandlesFeed::builder()
        .connector(connector)
        .config(FeedConfig::new(PAIR, "1m", 0))
        .build()
        .unwrap_err();
    assert!(matches!(err, CandlesError::InvalidConfig(_)));
}

#[test]
fn build_rejects_empty_trading_pair() {
    let (connector, _ctl) = MockConnector::new_with_controller().unwrap();
    let err = CandlesFeed::builder()
        .connector(connector)
        .interval("1m")
        .max_records(5)
        .build()
        .unwrap_err();
    assert!(matches!(err, CandlesError::InvalidConfig(_)));
}

#[test]
fn build_rejects_interval_unknown_to_connector() {
    let (connector, _ctl) = MockConnector::new_with_controller().unwrap();
    let err = CandlesFeed::builder()
        .connector(connector)
        .config(FeedConfig::new(PAIR, "3m", 10))
        .build()
        .unwrap_err();
    assert_eq!(err, CandlesError::UnsupportedInterval("3m".into()));
}

#[test]
fn builder_modifiers_land_in_config() {
    let (connector, _ctl) = MockConnector::new_with_controller().unwrap();
    let feed = CandlesFeed::builder()
        .connector(connector)
        .trading_pair(PAIR)
        .interval("5m")
        .max_records(42)
        .retry_delay(Duration::from_millis(250))
        .poll_interval(Duration::from_secs(3))
        .build()
        .unwrap();

    assert_eq!(feed.name(), "mock_BTC-USD");
    assert_eq!(feed.trading_pair(), PAIR);
    assert_eq!(feed.interval(), "5m");
    assert_eq!(feed.interval_in_seconds().unwrap(), 300);
    assert_eq!(feed.max_records(), 42);
    assert_eq!(feed.config().retry_delay, Duration::from_millis(250));
    assert_eq!(feed.config().poll_interval, Duration::from_secs(3));
    assert!(feed.is_empty());
    assert!(!feed.is_ready());
}

#[test]
fn readiness_persists_until_cleared() {
    let (connector, _ctl) = mock(100, EdgeMode::Inclusive, Vec::new());
    let feed = feed(connector, 2);

    feed.merge_observation(flat(60, 1));
    assert!(!feed.is_ready());
    feed.merge_observation(flat(120, 2));
    assert!(feed.is_ready());

    for ts in [180, 240, 300] {
        feed.merge_observation(flat(ts, 3));
        assert!(feed.is_ready());
        assert_eq!(feed.len(), 2);
    }
    assert_eq!(feed.latest().map(|c| c.timestamp), Some(300));

    feed.clear();
    assert!(feed.is_empty());
    assert!(!feed.is_ready());
}

#[test]
fn stale_and_replacement_observations() {
    let (connector, _ctl) = mock(100, EdgeMode::Inclusive, Vec::new());
    let feed = feed(connector, 3);

    feed.merge_observation(flat(120, 1));
    assert_eq!(
        feed.merge_observation(flat(60, 9)),
        candela::MergeOutcome::Stale
    );
    assert_eq!(
        feed.merge_observation(flat(120, 7)),
        candela::MergeOutcome::Replaced
    );
    let snapshot = feed.candles();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].close, candela::Decimal::from(7));
}

#[tokio::test]
async fn check_network_reports_connector_health() {
    let (connector, ctl) = mock(100, EdgeMode::Inclusive, minute_history(2));
    let feed = feed(connector, 5);

    assert_eq!(feed.check_network().await, NetworkStatus::Connected);

    ctl.set_health(MockBehavior::Fail(CandlesError::transport(
        "mock",
        "503 Service Unavailable",
    )))
    .await;
    assert_eq!(feed.check_network().await, NetworkStatus::NotConnected);

    ctl.set_health(MockBehavior::Return(())).await;
    assert!(feed.check_network().await.is_connected());
}
