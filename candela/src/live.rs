use candela_core::{Candle, MergeOutcome};
use tokio::sync::watch;

use crate::feed::CandlesFeed;
use crate::handle::TaskSet;
use crate::signal::stop_requested;

impl CandlesFeed {
    pub(crate) async fn run_live(
        self,
        mut stop: watch::Receiver<bool>,
        tasks: TaskSet,
        streaming: bool,
    ) {
        if streaming && !self.consume_push(&mut stop, &tasks).await {
            return;
        }
        self.poll_latest(&mut stop, &tasks).await;
    }

    /// Merge one observation and start a backfill when it seeded the window.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn ingest(&self, candle: Candle, stop: &watch::Receiver<bool>, tasks: &TaskSet) {
        let ts = candle.timestamp;
        let outcome = self.merge_observation(candle);
        match outcome {
            MergeOutcome::Initialized => {
                #[cfg(feature = "tracing")]
                tracing::info!(feed = %self.inner.name, timestamp = ts, "window seeded; starting backfill");
                self.spawn_backfill(stop.clone(), tasks);
            }
            MergeOutcome::Appended { evicted } => {
                #[cfg(feature = "tracing")]
                tracing::trace!(timestamp = ts, evicted = ?evicted, "candle appended");
            }
            MergeOutcome::Replaced => {
                #[cfg(feature = "tracing")]
                tracing::trace!(timestamp = ts, "current candle replaced");
            }
            MergeOutcome::Stale => {
                #[cfg(feature = "tracing")]
                tracing::debug!(timestamp = ts, "stale observation dropped");
            }
        }
    }

    /// Poll the latest candle until stopped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::poll_latest", skip_all, fields(feed = %self.inner.name))
    )]
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn poll_latest(&self, stop: &mut watch::Receiver<bool>, tasks: &TaskSet) {
        let connector = &self.inner.connector;
        let config = &self.inner.config;
        loop {
            let fetched = tokio::select! {
                biased;
                () = stop_requested(stop) => return,
                res = connector.fetch_latest(&config.trading_pair, &config.interval) => res,
            };
            let delay = match fetched {
                Ok(Some(candle)) => {
                    self.ingest(candle, stop, tasks);
                    config.poll_interval
                }
                Ok(None) => config.poll_interval,
                Err(err) if err.is_retryable() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "latest candle fetch failed; retrying");
                    config.retry_delay
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %err, "latest candle fetch failed; stopping live updates");
                    return;
                }
            };
            tokio::select! {
                biased;
                () = stop_requested(stop) => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Consume pushed messages until stopped or the channel closes.
    ///
    /// Returns `false` when stopped and `true` when the caller should fall
    /// back to polling.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::consume_push", skip_all, fields(feed = %self.inner.name))
    )]
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    async fn consume_push(&self, stop: &mut watch::Receiver<bool>, tasks: &TaskSet) -> bool {
        let (Some(channel), Some(push)) = (
            self.inner.push_channel.as_deref(),
            self.inner.connector.as_push_source(),
        ) else {
            return true;
        };
        let retry_delay = self.inner.config.retry_delay;
        loop {
            let received = tokio::select! {
                biased;
                () = stop_requested(stop) => return false,
                res = channel.receive() => res,
            };
            match received {
                Ok(Some(message)) => match push.parse_update(&message) {
                    Ok(Some(candle)) => self.ingest(candle, stop, tasks),
                    Ok(None) => {}
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %err, "dropping malformed push message");
                    }
                },
                Ok(None) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("push channel closed; falling back to polling");
                    return true;
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "push receive failed; retrying");
                    tokio::select! {
                        biased;
                        () = stop_requested(stop) => return false,
                        () = tokio::time::sleep(retry_delay) => {}
                    }
                }
            }
        }
    }
}
