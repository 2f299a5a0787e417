//! candela-dydx
//!
//! Candles connector for dYdX v3 perpetual markets. Implements
//! `CandlesConnector` over any `RequestGateway`; `new_default` wires the
//! `reqwest` gateway behind the dYdX rate limits.
//!
//! The v3 websocket has no candles channel. The connector still offers a push
//! source that subscribes to `v3_markets`, but reports that it does not
//! stream candles, so feeds keep polling the latest candle over REST.
#![warn(missing_docs)]

/// Endpoints, rate limits, and the interval table.
pub mod constants;
/// `reqwest` implementation of `RequestGateway`.
pub mod gateway;

use std::sync::Arc;

use async_trait::async_trait;
use candela_core::{
    Candle, CandlesConnector, CandlesError, CandlesRequest, IntervalMap, PushChannel, PushSource,
    RecordLayout, RequestGateway, RestRequest, TimestampFormat, normalize_page,
};
use candela_middleware::GatewayBuilder;
use chrono::{DateTime, SecondsFormat};
use serde_json::{Value, json};

pub use gateway::RestGateway;

const CONNECTOR_NAME: &str = "dydx_perpetuals";

/// Field names of a dYdX candle record. Taker volumes are not reported.
pub const RECORD_LAYOUT: RecordLayout = RecordLayout {
    timestamp: "startedAt",
    timestamp_format: TimestampFormat::Iso8601,
    open: "open",
    high: "high",
    low: "low",
    close: "close",
    volume: Some("baseTokenVolume"),
    quote_volume: Some("usdVolume"),
    trade_count: Some("trades"),
    taker_buy_base_volume: None,
    taker_buy_quote_volume: None,
};

/// dYdX v3 perpetual candles connector.
pub struct DydxPerpetualCandles {
    gateway: Arc<dyn RequestGateway>,
    intervals: IntervalMap,
    rest_url: String,
}

impl DydxPerpetualCandles {
    /// Connector over `gateway` against the public REST API.
    ///
    /// # Errors
    /// Returns `CandlesError::InvalidConfig` if the interval table fails
    /// validation.
    pub fn new(gateway: Arc<dyn RequestGateway>) -> Result<Self, CandlesError> {
        Ok(Self {
            gateway,
            intervals: IntervalMap::new(constants::INTERVALS)?,
            rest_url: constants::REST_URL.to_string(),
        })
    }

    /// Production connector: `reqwest` gateway throttled by
    /// [`constants::rate_limits`].
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new_default() -> Result<Self, CandlesError> {
        let raw: Arc<dyn RequestGateway> = Arc::new(RestGateway::new()?);
        let gateway = GatewayBuilder::new(raw)
            .with_rate_limits(constants::rate_limits())
            .build();
        Self::new(gateway)
    }

    /// Point the connector at another REST root (a proxy or a test server).
    #[must_use]
    pub fn with_rest_url(mut self, rest_url: impl Into<String>) -> Self {
        self.rest_url = rest_url.into().trim_end_matches('/').to_string();
        self
    }

    /// REST root in use.
    #[must_use]
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Websocket endpoint for push channels.
    #[must_use]
    pub const fn wss_url(&self) -> &'static str {
        constants::WSS_URL
    }

    /// URL of the liveness check.
    #[must_use]
    pub fn health_check_url(&self) -> String {
        format!("{}{}", self.rest_url, constants::HEALTH_CHECK_ENDPOINT)
    }

    /// URL of the candles endpoint for `market`.
    #[must_use]
    pub fn candles_url(&self, market: &str) -> String {
        format!("{}{}{market}", self.rest_url, constants::CANDLES_ENDPOINT)
    }

    /// Build the page request for `trading_pair`.
    ///
    /// # Errors
    /// `UnsupportedInterval` for unknown codes; `InvalidConfig` for times that
    /// cannot be rendered as ISO-8601.
    pub fn candles_request(
        &self,
        trading_pair: &str,
        interval: &str,
        req: CandlesRequest,
    ) -> Result<RestRequest, CandlesError> {
        let resolution = self.intervals.to_native(interval)?;
        let market = self.exchange_trading_pair(trading_pair);
        let mut rest = RestRequest::new(self.candles_url(&market), constants::CANDLES_ENDPOINT)
            .with_param("resolution", resolution)
            .with_param("limit", req.limit.min(constants::CANDLES_LIMIT));
        if let Some(start) = req.start_time {
            rest = rest.with_param("fromISO", epoch_seconds_to_iso(start)?);
        }
        if let Some(end) = req.end_time {
            rest = rest.with_param("toISO", epoch_seconds_to_iso(end)?);
        }
        Ok(rest)
    }

    /// Subscription handshake for `market`.
    #[must_use]
    pub fn subscribe_payload(market: &str) -> Value {
        json!({
            "type": "subscribe",
            "channel": constants::MARKETS_CHANNEL,
            "id": market,
        })
    }
}

/// Render epoch seconds the way the dYdX API expects (`2021-01-05T00:00:00.000Z`).
///
/// # Errors
/// Returns `CandlesError::InvalidConfig` when the value is out of range.
pub fn epoch_seconds_to_iso(secs: i64) -> Result<String, CandlesError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| CandlesError::InvalidConfig(format!("timestamp {secs} out of range")))
}

#[async_trait]
impl CandlesConnector for DydxPerpetualCandles {
    fn name(&self) -> &'static str {
        CONNECTOR_NAME
    }

    fn intervals(&self) -> &IntervalMap {
        &self.intervals
    }

    fn page_limit(&self) -> usize {
        constants::CANDLES_LIMIT
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_dydx::fetch_candles",
            skip(self),
            fields(connector = CONNECTOR_NAME),
        )
    )]
    async fn fetch_candles(
        &self,
        trading_pair: &str,
        interval: &str,
        req: CandlesRequest,
    ) -> Result<Vec<Candle>, CandlesError> {
        let rest = self.candles_request(trading_pair, interval, req)?;
        let body = self.gateway.execute(rest).await?;
        let records = body
            .get("candles")
            .and_then(Value::as_array)
            .ok_or_else(|| CandlesError::malformed("response has no candles array"))?;
        // pages arrive newest-first; normalize_page reorders them
        normalize_page(records, &RECORD_LAYOUT)
    }

    async fn health_check(&self) -> Result<(), CandlesError> {
        let req = RestRequest::new(self.health_check_url(), constants::HEALTH_CHECK_ENDPOINT);
        self.gateway.execute(req).await.map(|_| ())
    }

    fn as_push_source(&self) -> Option<&dyn PushSource> {
        Some(self as &dyn PushSource)
    }
}

#[async_trait]
impl PushSource for DydxPerpetualCandles {
    async fn subscribe(
        &self,
        channel: &dyn PushChannel,
        trading_pair: &str,
        _interval: &str,
    ) -> Result<(), CandlesError> {
        let market = self.exchange_trading_pair(trading_pair);
        channel.send(Self::subscribe_payload(&market)).await?;
        #[cfg(feature = "tracing")]
        tracing::info!(market = %market, channel = constants::MARKETS_CHANNEL, "subscribed to public market");
        Ok(())
    }
}
