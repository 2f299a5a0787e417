use async_trait::async_trait;
use serde_json::Value;

use crate::gateway::PushChannel;
use crate::{Candle, CandlesError, IntervalMap};

/// Bounds of one page request.
///
/// Times are in the exchange-native epoch resolution, the same unit as
/// [`Candle::timestamp`]. `end_time` is the edge already held by the window;
/// connectors pass it through as the exchange expects and the backfill engine
/// drops anything at or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandlesRequest {
    /// Earliest bucket start to include, if bounded.
    pub start_time: Option<i64>,
    /// Latest bucket start to include, if bounded.
    pub end_time: Option<i64>,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl CandlesRequest {
    /// The newest `limit` candles.
    #[must_use]
    pub const fn latest(limit: usize) -> Self {
        Self {
            start_time: None,
            end_time: None,
            limit,
        }
    }

    /// Up to `limit` candles ending at `end_time`.
    #[must_use]
    pub const fn ending_at(end_time: i64, limit: usize) -> Self {
        Self {
            start_time: None,
            end_time: Some(end_time),
            limit,
        }
    }
}

/// Exchange adapter used by the feed.
///
/// Implementations translate interval codes, build requests for their
/// gateway, and normalize pages into canonical candles.
#[async_trait]
pub trait CandlesConnector: Send + Sync {
    /// A stable identifier (e.g. "dydx_perpetuals").
    fn name(&self) -> &'static str;

    /// Name of a feed for `trading_pair`, used in logs.
    fn feed_name(&self, trading_pair: &str) -> String {
        format!("{}_{trading_pair}", self.name())
    }

    /// Supported interval codes and their native resolutions.
    fn intervals(&self) -> &IntervalMap;

    /// Largest page the candles endpoint returns.
    fn page_limit(&self) -> usize;

    /// Exchange spelling of a host trading pair. Default: unchanged.
    fn exchange_trading_pair(&self, trading_pair: &str) -> String {
        trading_pair.to_string()
    }

    /// Fetch one page, normalized and ordered oldest-first.
    ///
    /// # Errors
    /// Transport failures and malformed records; a page is never partially
    /// returned.
    async fn fetch_candles(
        &self,
        trading_pair: &str,
        interval: &str,
        req: CandlesRequest,
    ) -> Result<Vec<Candle>, CandlesError>;

    /// Fetch the most recent candle, if the exchange returned any.
    ///
    /// # Errors
    /// Same as [`CandlesConnector::fetch_candles`].
    async fn fetch_latest(
        &self,
        trading_pair: &str,
        interval: &str,
    ) -> Result<Option<Candle>, CandlesError> {
        let page = self
            .fetch_candles(trading_pair, interval, CandlesRequest::latest(1))
            .await?;
        Ok(page.into_iter().last())
    }

    /// Liveness check whose only contract is success or failure.
    ///
    /// # Errors
    /// Returns the transport error when the upstream is unreachable.
    async fn health_check(&self) -> Result<(), CandlesError>;

    /// Push capability, when the exchange offers a subscription channel.
    fn as_push_source(&self) -> Option<&dyn PushSource> {
        None
    }
}

/// Optional push capability of a connector.
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Send the subscription handshake for `trading_pair` on `channel`.
    ///
    /// # Errors
    /// Transport failures propagate; the caller decides whether to reconnect.
    async fn subscribe(
        &self,
        channel: &dyn PushChannel,
        trading_pair: &str,
        interval: &str,
    ) -> Result<(), CandlesError>;

    /// Whether subscribed channels deliver candle updates. When false the
    /// feed keeps polling even after subscribing.
    fn streams_candles(&self) -> bool {
        false
    }

    /// Extract a candle from a pushed message. `Ok(None)` for messages that
    /// carry no candle (acks, heartbeats).
    ///
    /// # Errors
    /// `CandlesError::MalformedRecord` when a candle payload cannot be parsed.
    fn parse_update(&self, message: &Value) -> Result<Option<Candle>, CandlesError> {
        let _ = message;
        Ok(None)
    }
}
