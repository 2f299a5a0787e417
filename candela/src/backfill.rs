//! Historical backfill at the oldest end of the window.
//!
//! Each round asks the connector for the page ending at the oldest held
//! timestamp, keeps only records strictly older than it, and prepends them.
//! The loop ends when the window is full, when the request budget is spent,
//! or when a stop is requested.

use candela_core::{CandlesError, CandlesRequest};
use tokio::sync::watch;

use crate::feed::CandlesFeed;
use crate::handle::TaskSet;
use crate::signal::stop_requested;

impl CandlesFeed {
    /// Successful page fetches a single backfill may spend.
    #[must_use]
    pub fn backfill_budget(&self) -> usize {
        let page_limit = self.inner.connector.page_limit().max(1);
        self.inner.config.max_records.div_ceil(page_limit) + 1
    }

    /// Fill the window with history until it holds `max_records` candles.
    ///
    /// Returns the number of candles added. An empty window is first seeded
    /// with the newest page. Transport and parsing failures are retried after
    /// `retry_delay`; they do not count against the budget. A page whose
    /// oldest edge moved while it was in flight is dropped and requested
    /// again, also free of charge.
    ///
    /// # Errors
    /// - `InsufficientHistory` once the budget is spent without filling the
    ///   window.
    /// - `Cancelled` when `stop` flips to `true` while fetching or waiting,
    ///   or when the window was cleared since the backfill began.
    /// - Any non-retryable connector error, e.g. `UnsupportedInterval`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::backfill",
            skip(self, stop),
            fields(feed = %self.inner.name, max_records = self.inner.config.max_records),
        )
    )]
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn fill_historical_candles(
        &self,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<usize, CandlesError> {
        let connector = &self.inner.connector;
        let config = &self.inner.config;
        let page_limit = connector.page_limit().max(1);
        let budget = self.backfill_budget();
        let generation = self.window().generation();
        let mut requests_executed = 0usize;
        let mut added_total = 0usize;

        loop {
            let (missing, end_timestamp, have) = {
                let window = self.window();
                if window.generation() != generation {
                    return Err(CandlesError::Cancelled);
                }
                (window.missing(), window.oldest_timestamp(), window.len())
            };
            if missing == 0 {
                #[cfg(feature = "tracing")]
                tracing::info!(requests_executed, added = added_total, "window filled");
                return Ok(added_total);
            }
            if requests_executed >= budget {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    requests_executed,
                    have,
                    wanted = config.max_records,
                    "no data available for the quantity of candles requested"
                );
                return Err(CandlesError::InsufficientHistory {
                    have,
                    wanted: config.max_records,
                });
            }

            // one extra record covers endpoints that include the bound itself
            let req = match end_timestamp {
                Some(end) => CandlesRequest::ending_at(end, page_limit.min(missing + 1)),
                None => CandlesRequest::latest(page_limit.min(missing)),
            };

            let fetched = tokio::select! {
                biased;
                () = stop_requested(stop) => return Err(CandlesError::Cancelled),
                res = connector.fetch_candles(&config.trading_pair, &config.interval, req) => res,
            };

            match fetched {
                Ok(page) => {
                    let page = match end_timestamp {
                        Some(end) => page.into_iter().filter(|c| c.timestamp < end).collect(),
                        None => page,
                    };
                    let merged = {
                        let mut window = self.window();
                        if window.generation() != generation {
                            return Err(CandlesError::Cancelled);
                        }
                        window.prepend_history_at(end_timestamp, page)
                    };
                    let Some(added) = merged else {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(end_timestamp = ?end_timestamp, "oldest edge moved; page dropped");
                        continue;
                    };
                    requests_executed += 1;
                    added_total += added;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        requests_executed,
                        missing,
                        end_timestamp = ?end_timestamp,
                        added,
                        "history page merged"
                    );
                }
                Err(err) if err.is_retryable() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        error = %err,
                        end_timestamp = ?end_timestamp,
                        retry_in_ms = u64::try_from(config.retry_delay.as_millis()).unwrap_or(u64::MAX),
                        "history fetch failed; retrying"
                    );
                    tokio::select! {
                        biased;
                        () = stop_requested(stop) => return Err(CandlesError::Cancelled),
                        () = tokio::time::sleep(config.retry_delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run a backfill in the background, tracked by `tasks`.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub(crate) fn spawn_backfill(&self, stop: watch::Receiver<bool>, tasks: &TaskSet) {
        let feed = self.clone();
        let task = self.spawn(async move {
            let mut stop = stop;
            match feed.fill_historical_candles(&mut stop).await {
                // exhaustion is already reported by the backfill itself
                Ok(_) | Err(CandlesError::Cancelled | CandlesError::InsufficientHistory { .. }) => {}
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(feed = %feed.inner.name, error = %err, "backfill ended");
                }
            }
        });
        tasks.push(task);
    }
}
