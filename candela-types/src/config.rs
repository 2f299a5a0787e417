//! Configuration types shared across the feed and connectors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CandlesError;

/// Configuration for a single candles feed (one trading pair, one interval).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Trading pair in the host's notation (e.g. "BTC-USD").
    pub trading_pair: String,
    /// Human interval code (e.g. "1m"); must be present in the connector's table.
    pub interval: String,
    /// Capacity of the rolling window.
    pub max_records: usize,
    /// Fixed delay before retrying a failed page fetch or poll.
    pub retry_delay: Duration,
    /// Delay between polls of the latest candle when the connector cannot push.
    pub poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trading_pair: String::new(),
            interval: "1m".to_string(),
            max_records: 150,
            retry_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl FeedConfig {
    /// Convenience constructor leaving the timing knobs at their defaults.
    pub fn new(
        trading_pair: impl Into<String>,
        interval: impl Into<String>,
        max_records: usize,
    ) -> Self {
        Self {
            trading_pair: trading_pair.into(),
            interval: interval.into(),
            max_records,
            ..Self::default()
        }
    }

    /// Check the connector-independent parts of the configuration.
    ///
    /// # Errors
    /// Returns `CandlesError::InvalidConfig` when the trading pair is empty or
    /// the capacity is zero.
    pub fn validate(&self) -> Result<(), CandlesError> {
        if self.trading_pair.trim().is_empty() {
            return Err(CandlesError::InvalidConfig(
                "trading_pair must not be empty".into(),
            ));
        }
        if self.max_records == 0 {
            return Err(CandlesError::InvalidConfig(
                "max_records must be positive".into(),
            ));
        }
        Ok(())
    }
}
