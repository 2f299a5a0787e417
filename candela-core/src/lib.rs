//! candela-core
//!
//! Core types, traits, and utilities shared across the candela workspace.
//!
//! - `candle`: the canonical OHLCV record.
//! - `interval`: the bijective interval code table.
//! - `normalize`: raw exchange record to canonical candle conversion.
//! - `window`: the fixed-capacity rolling window of candles.
//! - `gateway`: transport seams (`RequestGateway`, `PushChannel`).
//! - `connector`: the `CandlesConnector` trait implemented by exchange crates.
//!
//! Async runtime (Tokio)
//! ---------------------
//! `task` helpers are coupled to `tokio::task::JoinHandle` and
//! `tokio::sync::watch::Sender<bool>` for cooperative shutdown, so code that
//! runs feeds must run under a Tokio 1.x runtime.
#![warn(missing_docs)]

/// Canonical candle record and column names.
pub mod candle;
/// Connector trait implemented by exchange crates.
pub mod connector;
/// Transport seams consumed by connectors.
pub mod gateway;
/// Bidirectional interval code table.
pub mod interval;
/// Middleware trait implemented by gateway wrappers.
pub mod middleware;
/// Raw record normalization.
pub mod normalize;
/// Task handle utilities used by `FeedHandle` and tests.
pub mod task;
pub mod types;
/// Fixed-capacity rolling window.
pub mod window;

pub use candle::{CANDLE_COLUMNS, Candle};
pub use connector::{CandlesConnector, CandlesRequest, PushSource};
pub use gateway::{PushChannel, RequestGateway, RestRequest};
pub use interval::{IntervalMap, interval_in_seconds};
pub use middleware::GatewayMiddleware;
pub use normalize::{RecordLayout, TimestampFormat, normalize, normalize_page};
pub use types::*;
pub use window::{MergeOutcome, RollingWindow};
