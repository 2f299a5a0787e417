//! Rate-limit aware gateway wrapper.
//!
//! Every request names the bucket it is charged against. A bucket may link
//! to parent buckets with a weight, so one call can draw from both its
//! endpoint quota and a shared pool. When any charged bucket is exhausted the
//! caller is suspended until the window rolls over; exceeding a quota is
//! never surfaced as an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{
    CandlesError, GatewayMiddleware, RateLimit, RequestGateway, RestRequest,
};
use serde_json::{Value, json};
use tokio::time::Instant;

/// Shared accounting for a set of named buckets.
pub struct Throttler {
    limits: HashMap<String, RateLimit>,
    runtime: Mutex<HashMap<String, Bucket>>,
}

struct Bucket {
    limit: u64,
    window: Duration,
    used: u64,
    window_start: Instant,
}

impl Bucket {
    fn roll(&mut self, now: Instant) {
        if self.window.is_zero() {
            self.used = 0;
            return;
        }
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= self.window {
            self.used = 0;
            // keep windows aligned to regular boundaries across idle gaps
            let windows_passed = elapsed.as_nanos() / self.window.as_nanos();
            let offset = Duration::from_nanos(
                (windows_passed * self.window.as_nanos())
                    .try_into()
                    .unwrap_or(u64::MAX),
            );
            self.window_start += offset;
        }
    }

    // A charge larger than the whole limit is let through on a fresh window.
    fn wait_for(&self, now: Instant, units: u64) -> Option<Duration> {
        if self.used == 0 || self.used.saturating_add(units) <= self.limit {
            return None;
        }
        let elapsed = now.duration_since(self.window_start);
        Some(self.window.saturating_sub(elapsed))
    }
}

impl Throttler {
    /// Build a throttler for `limits`. A repeated `limit_id` replaces the
    /// earlier definition.
    #[must_use]
    pub fn new(limits: impl IntoIterator<Item = RateLimit>) -> Self {
        let now = Instant::now();
        let limits: HashMap<String, RateLimit> = limits
            .into_iter()
            .map(|l| (l.limit_id.clone(), l))
            .collect();
        let runtime = limits
            .values()
            .map(|l| {
                (
                    l.limit_id.clone(),
                    Bucket {
                        limit: l.limit,
                        window: l.window,
                        used: 0,
                        window_start: now,
                    },
                )
            })
            .collect();
        Self {
            limits,
            runtime: Mutex::new(runtime),
        }
    }

    /// Configured buckets.
    pub fn limits(&self) -> impl Iterator<Item = &RateLimit> {
        self.limits.values()
    }

    /// Try to charge one request against `limit_id` and its linked parents.
    ///
    /// All buckets are charged together or not at all. Requests tagged with
    /// an unknown bucket are not throttled.
    ///
    /// # Errors
    /// Returns the time to wait before retrying when any bucket is exhausted.
    pub fn try_acquire(&self, limit_id: &str) -> Result<(), Duration> {
        let Some(limit) = self.limits.get(limit_id) else {
            return Ok(());
        };
        let charges: Vec<(&str, u64)> = std::iter::once((limit_id, 1))
            .chain(
                limit
                    .linked_limits
                    .iter()
                    .map(|l| (l.limit_id.as_str(), l.weight)),
            )
            .collect();

        let now = Instant::now();
        let mut rt = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);

        let mut wait: Option<Duration> = None;
        for (id, units) in &charges {
            if let Some(bucket) = rt.get_mut(*id) {
                bucket.roll(now);
                if let Some(w) = bucket.wait_for(now, *units) {
                    wait = Some(wait.map_or(w, |cur| cur.max(w)));
                }
            }
        }
        if let Some(w) = wait {
            return Err(w);
        }

        for (id, units) in charges {
            if let Some(bucket) = rt.get_mut(id) {
                bucket.used = bucket.used.saturating_add(units);
            }
        }
        Ok(())
    }

    /// Suspend until one request against `limit_id` fits every charged bucket.
    pub async fn acquire(&self, limit_id: &str) {
        loop {
            match self.try_acquire(limit_id) {
                Ok(()) => return,
                Err(wait) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        limit_id,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "rate limit reached; waiting for window"
                    );
                    // never spin on a zero wait at an exact boundary
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Units left in the current window of `limit_id`.
    #[must_use]
    pub fn remaining(&self, limit_id: &str) -> Option<u64> {
        let now = Instant::now();
        let mut rt = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = rt.get_mut(limit_id)?;
        bucket.roll(now);
        Some(bucket.limit.saturating_sub(bucket.used))
    }
}

/// Gateway wrapper that throttles every request before delegating.
pub struct ThrottledGateway {
    inner: Arc<dyn RequestGateway>,
    throttler: Arc<Throttler>,
}

impl ThrottledGateway {
    /// Wrap `inner` with shared accounting.
    pub fn new(inner: Arc<dyn RequestGateway>, throttler: Arc<Throttler>) -> Self {
        Self { inner, throttler }
    }

    /// Access the inner gateway.
    pub fn inner(&self) -> &Arc<dyn RequestGateway> {
        &self.inner
    }

    /// Access the shared throttler.
    pub fn throttler(&self) -> &Arc<Throttler> {
        &self.throttler
    }
}

#[async_trait]
impl RequestGateway for ThrottledGateway {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_middleware::throttled_execute",
            skip(self, req),
            fields(gateway = self.inner.name(), limit_id = %req.limit_id),
        )
    )]
    async fn execute(&self, req: RestRequest) -> Result<Value, CandlesError> {
        self.throttler.acquire(&req.limit_id).await;
        self.inner.execute(req).await
    }
}

/// Middleware config for constructing a [`ThrottledGateway`].
pub struct ThrottleMiddleware {
    /// Rate limits shared by every request routed through the gateway,
    /// keyed by each request's `limit_id`.
    pub limits: Vec<RateLimit>,
}

impl ThrottleMiddleware {
    /// Throttle requests against `limits`. A request whose `limit_id` has
    /// no entry passes through unthrottled.
    #[must_use]
    pub const fn new(limits: Vec<RateLimit>) -> Self {
        Self { limits }
    }
}

impl GatewayMiddleware for ThrottleMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn RequestGateway>) -> Arc<dyn RequestGateway> {
        let throttler = Arc::new(Throttler::new(self.limits));
        Arc::new(ThrottledGateway::new(inner, throttler))
    }

    fn name(&self) -> &'static str {
        "ThrottledGateway"
    }

    fn config_json(&self) -> Value {
        let limits: Vec<Value> = self
            .limits
            .iter()
            .map(|l| {
                json!({
                    "limit_id": l.limit_id,
                    "limit": l.limit,
                    "window_ms": u64::try_from(l.window.as_millis()).unwrap_or(u64::MAX),
                    "linked_limits": l
                        .linked_limits
                        .iter()
                        .map(|p| json!({ "limit_id": p.limit_id, "weight": p.weight }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({ "limits": limits })
    }
}
