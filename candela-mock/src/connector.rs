use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{
    Candle, CandlesConnector, CandlesError, CandlesRequest, IntervalMap, PushChannel, PushSource,
    RecordLayout, TimestampFormat, normalize,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Instruction for how a call should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(CandlesError),
    /// Hang indefinitely (simulate a stalled request).
    Hang,
    /// Succeed after the given delay. Page contents are read when the call
    /// starts, as a slow response from the exchange would be.
    Delay(Duration),
}

/// How a page request treats its `end_time` bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    /// Only records strictly before the bound.
    Exclusive,
    /// Records up to and including the bound; the bound counts toward `limit`.
    #[default]
    Inclusive,
    /// `limit` records strictly before the bound plus the bound record itself.
    Overlap,
}

// Pushed candle messages use short keys and epoch seconds.
const PUSH_LAYOUT: RecordLayout = RecordLayout {
    timestamp: "t",
    timestamp_format: TimestampFormat::EpochSeconds,
    open: "o",
    high: "h",
    low: "l",
    close: "c",
    volume: Some("v"),
    quote_volume: None,
    trade_count: None,
    taker_buy_base_volume: None,
    taker_buy_quote_volume: None,
};

struct InternalState {
    history: BTreeMap<i64, Candle>,
    fetch_script: VecDeque<MockBehavior<()>>,
    health: MockBehavior<()>,
    subscribe: MockBehavior<()>,
    requests: Vec<CandlesRequest>,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            history: BTreeMap::new(),
            fetch_script: VecDeque::new(),
            health: MockBehavior::Return(()),
            subscribe: MockBehavior::Return(()),
            requests: Vec::new(),
        }
    }
}

/// Controller handle used by tests to drive the mock from the outside.
#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<InternalState>>,
}

impl MockController {
    /// Replace the whole history.
    pub async fn set_history(&self, candles: Vec<Candle>) {
        let mut guard = self.state.lock().await;
        guard.history = candles.into_iter().map(|c| (c.timestamp, c)).collect();
    }

    /// Insert or replace one candle, as an exchange does when a bucket
    /// opens or its in-progress values change.
    pub async fn publish(&self, candle: Candle) {
        let mut guard = self.state.lock().await;
        guard.history.insert(candle.timestamp, candle);
    }

    /// Fail the next page fetch with `err`. Queued behaviors are consumed in order.
    pub async fn fail_next(&self, err: CandlesError) {
        let mut guard = self.state.lock().await;
        guard.fetch_script.push_back(MockBehavior::Fail(err));
    }

    /// Queue an arbitrary behavior for the next page fetch.
    pub async fn script_next(&self, behavior: MockBehavior<()>) {
        let mut guard = self.state.lock().await;
        guard.fetch_script.push_back(behavior);
    }

    /// Stall the next page fetch forever.
    pub async fn hang_next(&self) {
        let mut guard = self.state.lock().await;
        guard.fetch_script.push_back(MockBehavior::Hang);
    }

    /// Set the outcome of `health_check`.
    pub async fn set_health(&self, behavior: MockBehavior<()>) {
        let mut guard = self.state.lock().await;
        guard.health = behavior;
    }

    /// Set the outcome of the push subscription handshake.
    pub async fn set_subscribe(&self, behavior: MockBehavior<()>) {
        let mut guard = self.state.lock().await;
        guard.subscribe = behavior;
    }

    /// Every page request received so far, in order.
    pub async fn requests(&self) -> Vec<CandlesRequest> {
        let guard = self.state.lock().await;
        guard.requests.clone()
    }

    /// Requests bounded by an end time (backfill pages).
    pub async fn history_requests(&self) -> Vec<CandlesRequest> {
        let guard = self.state.lock().await;
        guard
            .requests
            .iter()
            .filter(|r| r.end_time.is_some())
            .copied()
            .collect()
    }

    /// Clear the request log and any queued behaviors.
    pub async fn reset_script(&self) {
        let mut guard = self.state.lock().await;
        guard.requests.clear();
        guard.fetch_script.clear();
    }
}

/// Builder for [`MockConnector`].
pub struct MockConnectorBuilder {
    name: &'static str,
    page_limit: usize,
    edge: EdgeMode,
    intervals: Vec<(String, String)>,
    push: Option<bool>,
    history: Vec<Candle>,
}

impl Default for MockConnectorBuilder {
    fn default() -> Self {
        Self {
            name: "mock",
            page_limit: 100,
            edge: EdgeMode::default(),
            intervals: [("1m", "1MIN"), ("5m", "5MINS"), ("1h", "1HOUR"), ("1d", "1DAY")]
                .into_iter()
                .map(|(c, n)| (c.to_string(), n.to_string()))
                .collect(),
            push: None,
            history: Vec::new(),
        }
    }
}

impl MockConnectorBuilder {
    /// Connector name reported in logs and errors.
    #[must_use]
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Largest page served per request.
    #[must_use]
    pub const fn page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    /// How `end_time` bounds are applied.
    #[must_use]
    pub const fn edge_mode(mut self, edge: EdgeMode) -> Self {
        self.edge = edge;
        self
    }

    /// Replace the interval table.
    #[must_use]
    pub fn intervals(mut self, pairs: &[(&str, &str)]) -> Self {
        self.intervals = pairs
            .iter()
            .map(|(c, n)| ((*c).to_string(), (*n).to_string()))
            .collect();
        self
    }

    /// Advertise a push source; `streams_candles` controls whether pushed
    /// messages carry candles.
    #[must_use]
    pub const fn with_push(mut self, streams_candles: bool) -> Self {
        self.push = Some(streams_candles);
        self
    }

    /// Initial history.
    #[must_use]
    pub fn history(mut self, candles: Vec<Candle>) -> Self {
        self.history = candles;
        self
    }

    /// Build the connector and its controller.
    ///
    /// # Errors
    /// Returns `CandlesError::InvalidConfig` when the interval table is not a
    /// bijection or the page limit is zero.
    pub fn build(self) -> Result<(Arc<MockConnector>, MockController), CandlesError> {
        if self.page_limit == 0 {
            return Err(CandlesError::InvalidConfig(
                "page_limit must be positive".into(),
            ));
        }
        let intervals = IntervalMap::new(self.intervals)?;
        let state = Arc::new(Mutex::new(InternalState {
            history: self.history.into_iter().map(|c| (c.timestamp, c)).collect(),
            ..InternalState::default()
        }));
        let controller = MockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(MockConnector {
            name: self.name,
            page_limit: self.page_limit,
            edge: self.edge,
            intervals,
            push: self.push,
            state,
        });
        Ok((me, controller))
    }
}

/// Scriptable in-memory candles connector.
pub struct MockConnector {
    name: &'static str,
    page_limit: usize,
    edge: EdgeMode,
    intervals: IntervalMap,
    push: Option<bool>,
    state: Arc<Mutex<InternalState>>,
}

impl MockConnector {
    /// Start configuring a mock.
    #[must_use]
    pub fn builder() -> MockConnectorBuilder {
        MockConnectorBuilder::default()
    }

    /// A default mock and its controller.
    ///
    /// # Errors
    /// Never fails with the built-in interval table.
    pub fn new_with_controller() -> Result<(Arc<Self>, MockController), CandlesError> {
        Self::builder().build()
    }

    /// Candle message in the shape [`PushSource::parse_update`] accepts.
    #[must_use]
    pub fn candle_message(candle: &Candle) -> Value {
        json!({
            "type": "channel_data",
            "contents": {
                "candle": {
                    "t": candle.timestamp,
                    "o": candle.open.to_string(),
                    "h": candle.high.to_string(),
                    "l": candle.low.to_string(),
                    "c": candle.close.to_string(),
                    "v": candle.volume.to_string(),
                }
            }
        })
    }

    fn select(&self, history: &BTreeMap<i64, Candle>, req: CandlesRequest) -> Vec<Candle> {
        let limit = req.limit.min(self.page_limit);
        let lower = req.start_time.unwrap_or(i64::MIN);
        if req.end_time.is_some_and(|end| end < lower) {
            return Vec::new();
        }
        let mut page: Vec<Candle> = match req.end_time {
            None => history
                .range(lower..)
                .rev()
                .take(limit)
                .map(|(_, c)| c.clone())
                .collect(),
            Some(end) => match self.edge {
                EdgeMode::Exclusive => history
                    .range(lower..end)
                    .rev()
                    .take(limit)
                    .map(|(_, c)| c.clone())
                    .collect(),
                EdgeMode::Inclusive => history
                    .range(lower..=end)
                    .rev()
                    .take(limit)
                    .map(|(_, c)| c.clone())
                    .collect(),
                EdgeMode::Overlap => history
                    .get(&end)
                    .cloned()
                    .into_iter()
                    .chain(
                        history
                            .range(lower..end)
                            .rev()
                            .take(limit)
                            .map(|(_, c)| c.clone()),
                    )
                    .collect(),
            },
        };
        page.reverse();
        page
    }
}

#[async_trait]
impl CandlesConnector for MockConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn intervals(&self) -> &IntervalMap {
        &self.intervals
    }

    fn page_limit(&self) -> usize {
        self.page_limit
    }

    async fn fetch_candles(
        &self,
        _trading_pair: &str,
        interval: &str,
        req: CandlesRequest,
    ) -> Result<Vec<Candle>, CandlesError> {
        self.intervals.to_native(interval)?;
        // Snapshot behavior without holding the lock across await points
        let (behavior, page) = {
            let mut guard = self.state.lock().await;
            guard.requests.push(req);
            let behavior = guard.fetch_script.pop_front();
            let page = self.select(&guard.history, req);
            (behavior, page)
        };

        match behavior {
            None | Some(MockBehavior::Return(())) => Ok(page),
            Some(MockBehavior::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(page)
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn health_check(&self) -> Result<(), CandlesError> {
        let behavior = {
            let guard = self.state.lock().await;
            guard.health.clone()
        };
        match behavior {
            MockBehavior::Return(()) => Ok(()),
            MockBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            MockBehavior::Fail(e) => Err(e),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn as_push_source(&self) -> Option<&dyn PushSource> {
        self.push.map(|_| self as &dyn PushSource)
    }
}

#[async_trait]
impl PushSource for MockConnector {
    async fn subscribe(
        &self,
        channel: &dyn PushChannel,
        trading_pair: &str,
        interval: &str,
    ) -> Result<(), CandlesError> {
        let native = self.intervals.to_native(interval)?.to_string();
        let behavior = {
            let guard = self.state.lock().await;
            guard.subscribe.clone()
        };
        match behavior {
            MockBehavior::Return(()) => {}
            MockBehavior::Delay(delay) => tokio::time::sleep(delay).await,
            MockBehavior::Fail(e) => return Err(e),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
        channel
            .send(json!({
                "type": "subscribe",
                "channel": "candles",
                "id": trading_pair,
                "resolution": native,
            }))
            .await
    }

    fn streams_candles(&self) -> bool {
        self.push.unwrap_or(false)
    }

    fn parse_update(&self, message: &Value) -> Result<Option<Candle>, CandlesError> {
        if message.get("type").and_then(Value::as_str) != Some("channel_data") {
            return Ok(None);
        }
        match message.pointer("/contents/candle") {
            Some(raw) => normalize(raw, &PUSH_LAYOUT).map(Some),
            None => Ok(None),
        }
    }
}
