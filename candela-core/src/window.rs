//! Fixed-capacity rolling window of candles.
//!
//! The window keeps candles ordered oldest to newest with strictly increasing
//! timestamps. Two writers touch it: the live loop merges observations at the
//! newest end and the backfill engine prepends history at the oldest end.
//! The type itself is not synchronized; the feed wraps it in a mutex and
//! never holds the guard across a suspension point.

use std::collections::VecDeque;

use crate::{Candle, CandlesError};

/// Result of merging one observation into the newest end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The window was empty; the candle is now its only element.
    Initialized,
    /// A newer bucket opened. `evicted` is the timestamp dropped to respect
    /// capacity, if any.
    Appended {
        /// Timestamp of the evicted oldest candle.
        evicted: Option<i64>,
    },
    /// Same bucket as the newest candle, which was replaced.
    Replaced,
    /// Older than the newest candle; discarded.
    Stale,
}

impl MergeOutcome {
    /// True when the window was mutated.
    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::Stale)
    }
}

/// Bounded, time-ordered double-ended sequence of candles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    candles: VecDeque<Candle>,
    capacity: usize,
    generation: u64,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` candles.
    ///
    /// # Errors
    /// Returns `CandlesError::InvalidConfig` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CandlesError> {
        if capacity == 0 {
            return Err(CandlesError::InvalidConfig(
                "window capacity must be positive".into(),
            ));
        }
        Ok(Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
            generation: 0,
        })
    }

    /// Configured maximum length.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// True when no candle has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// True once the window holds `capacity` candles.
    ///
    /// Tail insertions evict the oldest candle, so a ready window stays ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.candles.len() == self.capacity
    }

    /// Number of candles still needed to reach capacity.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.capacity.saturating_sub(self.candles.len())
    }

    /// Oldest candle, if any.
    #[must_use]
    pub fn oldest(&self) -> Option<&Candle> {
        self.candles.front()
    }

    /// Newest candle, if any.
    #[must_use]
    pub fn newest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Timestamp of the oldest candle.
    #[must_use]
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.oldest().map(|c| c.timestamp)
    }

    /// Timestamp of the newest candle.
    #[must_use]
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.newest().map(|c| c.timestamp)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Owned snapshot, oldest to newest.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }

    /// Timestamps, oldest to newest.
    #[must_use]
    pub fn timestamps(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.timestamp).collect()
    }

    /// Merge one observation at the newest end.
    ///
    /// Newer buckets are appended (evicting the oldest candle at capacity),
    /// the current bucket is replaced, and older observations are dropped.
    pub fn merge_latest(&mut self, candle: Candle) -> MergeOutcome {
        let Some(newest) = self.candles.back_mut() else {
            self.candles.push_back(candle);
            return MergeOutcome::Initialized;
        };

        if candle.timestamp == newest.timestamp {
            *newest = candle;
            return MergeOutcome::Replaced;
        }
        if candle.timestamp < newest.timestamp {
            return MergeOutcome::Stale;
        }

        let evicted = if self.candles.len() >= self.capacity {
            self.candles.pop_front().map(|c| c.timestamp)
        } else {
            None
        };
        self.candles.push_back(candle);
        MergeOutcome::Appended { evicted }
    }

    /// Prepend history at the oldest end and return how many candles were added.
    ///
    /// The page may arrive in any order and may overlap the window. Only
    /// candles strictly older than the current oldest are kept, and of those
    /// only the newest `missing()` so the window never exceeds capacity. On an
    /// empty window the newest `capacity` candles of the page seed it.
    pub fn prepend_history(&mut self, page: Vec<Candle>) -> usize {
        let room = self.missing();
        if room == 0 || page.is_empty() {
            return 0;
        }

        let boundary = self.oldest_timestamp();
        let mut older: Vec<Candle> = page
            .into_iter()
            .filter(|c| boundary.is_none_or(|edge| c.timestamp < edge))
            .collect();
        older.sort_by_key(|c| c.timestamp);
        older.dedup_by_key(|c| c.timestamp);

        let skip = older.len().saturating_sub(room);
        let added = older.len() - skip;
        // push newest-first so the front ends up oldest
        for candle in older.into_iter().skip(skip).rev() {
            self.candles.push_front(candle);
        }
        added
    }

    /// Prepend history read against `edge`, the oldest timestamp observed
    /// when the page was requested.
    ///
    /// Returns `None` and leaves the window untouched when the oldest end
    /// moved in the meantime; the page may no longer be contiguous with it.
    pub fn prepend_history_at(&mut self, edge: Option<i64>, page: Vec<Candle>) -> Option<usize> {
        if self.oldest_timestamp() != edge {
            return None;
        }
        Some(self.prepend_history(page))
    }

    /// Counter bumped by every [`RollingWindow::clear`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Remove every candle and start a new generation.
    pub fn clear(&mut self) {
        self.candles.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}
