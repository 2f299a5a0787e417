//! Candela keeps a bounded, continuously reconciled window of OHLCV candles
//! for one trading pair at one interval.
//!
//! Overview
//! - Wraps any connector implementing the `candela_core::CandlesConnector`
//!   contract.
//! - Seeds the window from the first live observation, then backfills older
//!   history over REST until the window holds `max_records` candles.
//! - Keeps the newest end current by polling the latest candle, or by
//!   consuming a push channel when the connector streams candles.
//! - Exposes snapshots, readiness, and a connectivity check to the host.
//!
//! Key behaviors and trade-offs
//! - Backfill budget: at most `ceil(max_records / page_limit) + 1` successful
//!   page fetches. A source with less history ends with
//!   `CandlesError::InsufficientHistory` instead of looping forever.
//! - Retry: transport and parsing failures are retried after a fixed
//!   `retry_delay`, without limit. Only a stop request ends the loop early.
//! - Live merge: newer buckets append (evicting the oldest at capacity), the
//!   current bucket is replaced in place, and older observations are dropped.
//! - Concurrency: the window sits behind one `std::sync::Mutex` that is never
//!   held across an await, so backfill (oldest end) and live updates (newest
//!   end) interleave without corrupting the series.
//! - Shutdown: `FeedHandle::stop` signals every task and waits for them;
//!   dropping the handle signals and aborts.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{CandlesFeed, FeedConfig};
//! use candela_dydx::DydxPerpetualCandles;
//!
//! let connector = Arc::new(DydxPerpetualCandles::new_default()?);
//! let feed = CandlesFeed::builder()
//!     .connector(connector)
//!     .config(FeedConfig::new("BTC-USD", "1m", 150))
//!     .build()?;
//!
//! let handle = feed.start().await?;
//! while !feed.is_ready() {
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//! }
//! println!("{:?}", feed.candles().last());
//! handle.stop().await;
//! ```
#![warn(missing_docs)]

mod backfill;
mod feed;
mod handle;
mod live;
mod signal;

pub use feed::{CandlesFeed, CandlesFeedBuilder};
pub use handle::FeedHandle;

pub use candela_core::{
    CANDLE_COLUMNS, Candle, CandlesConnector, CandlesError, CandlesRequest, Decimal, FeedConfig,
    IntervalMap, MergeOutcome, NetworkStatus, PushChannel, PushSource, RateLimit, RequestGateway,
    RestRequest, RollingWindow, interval_in_seconds,
};
pub use candela_middleware::{GatewayBuilder, ThrottledGateway, Throttler};
