use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use candela_core::{
    Candle, CandlesConnector, CandlesError, FeedConfig, MergeOutcome, NetworkStatus, PushChannel,
    RollingWindow, interval_in_seconds,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::handle::{FeedHandle, TaskSet};

pub(crate) struct FeedInner {
    pub(crate) name: String,
    pub(crate) connector: Arc<dyn CandlesConnector>,
    pub(crate) config: FeedConfig,
    pub(crate) push_channel: Option<Arc<dyn PushChannel>>,
    pub(crate) window: Mutex<RollingWindow>,
    #[cfg(feature = "tracing")]
    pub(crate) span: tracing::Span,
}

/// A rolling window of candles for one trading pair at one interval.
///
/// Cloning is cheap; clones share the same window and connector.
#[derive(Clone)]
pub struct CandlesFeed {
    pub(crate) inner: Arc<FeedInner>,
}

/// Builder for [`CandlesFeed`].
pub struct CandlesFeedBuilder {
    connector: Option<Arc<dyn CandlesConnector>>,
    config: FeedConfig,
    push_channel: Option<Arc<dyn PushChannel>>,
    #[cfg(feature = "tracing")]
    span: Option<tracing::Span>,
}

impl Default for CandlesFeedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandlesFeedBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connector: None,
            config: FeedConfig::default(),
            push_channel: None,
            #[cfg(feature = "tracing")]
            span: None,
        }
    }

    /// Exchange connector serving pages and the latest candle.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn CandlesConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the whole feed configuration.
    #[must_use]
    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Trading pair in the host's notation.
    #[must_use]
    pub fn trading_pair(mut self, trading_pair: impl Into<String>) -> Self {
        self.config.trading_pair = trading_pair.into();
        self
    }

    /// Interval code, e.g. "1m".
    #[must_use]
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.config.interval = interval.into();
        self
    }

    /// Capacity of the window.
    #[must_use]
    pub const fn max_records(mut self, max_records: usize) -> Self {
        self.config.max_records = max_records;
        self
    }

    /// Delay before retrying a failed fetch.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Delay between polls of the latest candle.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Attach a push channel. The connector's push source subscribes on it
    /// when the feed starts.
    #[must_use]
    pub fn push_channel(mut self, channel: Arc<dyn PushChannel>) -> Self {
        self.push_channel = Some(channel);
        self
    }

    /// Parent span for every task the feed spawns.
    #[cfg(feature = "tracing")]
    #[must_use]
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Build the feed.
    ///
    /// # Errors
    /// `InvalidConfig` when no connector was given, the trading pair is empty,
    /// or the capacity is zero. `UnsupportedInterval` when the connector does
    /// not know the interval code.
    pub fn build(self) -> Result<CandlesFeed, CandlesError> {
        let connector = self
            .connector
            .ok_or_else(|| CandlesError::InvalidConfig("a connector is required".into()))?;
        self.config.validate()?;
        connector.intervals().to_native(&self.config.interval)?;
        let window = RollingWindow::new(self.config.max_records)?;
        let name = connector.feed_name(&self.config.trading_pair);

        #[cfg(feature = "tracing")]
        let span = self.span.unwrap_or_else(|| {
            tracing::info_span!(
                "candela::feed",
                feed = %name,
                interval = %self.config.interval,
                max_records = self.config.max_records,
            )
        });

        Ok(CandlesFeed {
            inner: Arc::new(FeedInner {
                name,
                connector,
                config: self.config,
                push_channel: self.push_channel,
                window: Mutex::new(window),
                #[cfg(feature = "tracing")]
                span,
            }),
        })
    }
}

impl CandlesFeed {
    /// Start building a feed.
    #[must_use]
    pub fn builder() -> CandlesFeedBuilder {
        CandlesFeedBuilder::new()
    }

    /// Feed name, `<connector>_<trading pair>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Configuration the feed was built with.
    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Host trading pair.
    #[must_use]
    pub fn trading_pair(&self) -> &str {
        &self.inner.config.trading_pair
    }

    /// Interval code.
    #[must_use]
    pub fn interval(&self) -> &str {
        &self.inner.config.interval
    }

    /// Interval length in seconds.
    ///
    /// # Errors
    /// Returns `UnsupportedInterval` for codes without a known unit.
    pub fn interval_in_seconds(&self) -> Result<i64, CandlesError> {
        interval_in_seconds(&self.inner.config.interval)
    }

    /// Capacity of the window.
    #[must_use]
    pub fn max_records(&self) -> usize {
        self.inner.config.max_records
    }

    /// The connector serving this feed.
    #[must_use]
    pub fn connector(&self) -> &Arc<dyn CandlesConnector> {
        &self.inner.connector
    }

    /// Consistent snapshot of the window, oldest to newest.
    #[must_use]
    pub fn candles(&self) -> Vec<Candle> {
        self.window().to_vec()
    }

    /// Timestamps currently held, oldest to newest.
    #[must_use]
    pub fn timestamps(&self) -> Vec<i64> {
        self.window().timestamps()
    }

    /// Number of candles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window().len()
    }

    /// `true` while the window holds no candle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window().is_empty()
    }

    /// `true` once the window holds `max_records` candles. Stays true until
    /// the window is cleared.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.window().is_ready()
    }

    /// Newest candle, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Candle> {
        self.window().newest().cloned()
    }

    /// Query the exchange's liveness endpoint. Failures are reported as
    /// `NotConnected`, never raised.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn check_network(&self) -> NetworkStatus {
        match self.inner.connector.health_check().await {
            Ok(()) => NetworkStatus::Connected,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(feed = %self.inner.name, error = %err, "health check failed");
                NetworkStatus::NotConnected
            }
        }
    }

    /// Merge one live observation into the newest end of the window.
    ///
    /// This never triggers a backfill; running feeds do that themselves
    /// when the first observation lands.
    pub fn merge_observation(&self, candle: Candle) -> MergeOutcome {
        self.window().merge_latest(candle)
    }

    /// Drop every candle. The next live observation reseeds the window.
    pub fn clear(&self) {
        self.window().clear();
    }

    /// Start the live loop.
    ///
    /// With a push channel attached and a connector that exposes a push
    /// source, the channel is connected and subscribed before any task is
    /// spawned. Candles then arrive from the channel when the source streams
    /// them; otherwise the latest candle is polled every `poll_interval`.
    ///
    /// # Errors
    /// Connection and subscription failures are returned as-is and no task
    /// is left running.
    pub async fn start(&self) -> Result<FeedHandle, CandlesError> {
        let streaming = self.subscribe().await?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks = TaskSet::default();

        let feed = self.clone();
        let spawned = tasks.clone();
        let live = self.spawn(async move { feed.run_live(stop_rx, spawned, streaming).await });

        #[cfg(feature = "tracing")]
        tracing::info!(feed = %self.inner.name, streaming, "candles feed started");
        Ok(FeedHandle::new(live, tasks, stop_tx))
    }

    async fn subscribe(&self) -> Result<bool, CandlesError> {
        let Some(channel) = self.inner.push_channel.as_deref() else {
            return Ok(false);
        };
        let Some(push) = self.inner.connector.as_push_source() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(feed = %self.inner.name, "push channel attached but connector has no push source");
            return Ok(false);
        };
        channel.connect().await?;
        push.subscribe(channel, &self.inner.config.trading_pair, &self.inner.config.interval)
            .await?;
        Ok(push.streams_candles())
    }

    pub(crate) fn window(&self) -> MutexGuard<'_, RollingWindow> {
        self.inner
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        #[cfg(feature = "tracing")]
        {
            use tracing::Instrument;
            tokio::spawn(fut.instrument(self.inner.span.clone()))
        }
        #[cfg(not(feature = "tracing"))]
        {
            tokio::spawn(fut)
        }
    }
}

impl std::fmt::Debug for CandlesFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandlesFeed")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
