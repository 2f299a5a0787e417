//! dYdX v3 endpoints, limits, and the interval table.

use std::time::Duration;

use candela_core::RateLimit;

/// REST and websocket API version.
pub const API_VERSION: &str = "v3";
/// Public REST host.
pub const REST_BASE_URL: &str = "https://api.dydx.exchange";
/// Versioned REST root.
pub const REST_URL: &str = "https://api.dydx.exchange/v3";
/// Public websocket endpoint.
pub const WSS_URL: &str = "wss://api.dydx.exchange/v3/ws";

/// Server time endpoint, used as the liveness check.
pub const HEALTH_CHECK_ENDPOINT: &str = "/time";
/// Candles endpoint prefix; the market is appended.
pub const CANDLES_ENDPOINT: &str = "/candles/";

/// Max candles per request.
pub const CANDLES_LIMIT: usize = 100;

/// Interval codes and dYdX resolutions.
pub const INTERVALS: [(&str, &str); 7] = [
    ("1m", "1MIN"),
    ("5m", "5MINS"),
    ("15m", "15MINS"),
    ("30m", "30MINS"),
    ("1h", "1HOUR"),
    ("4h", "4HOURS"),
    ("1d", "1DAY"),
];

/// Shared pool charged by every public endpoint.
pub const PUBLIC_ENDPOINT_LIMIT: &str = "PublicPoints";

/// Websocket channel used for the subscription handshake.
pub const MARKETS_CHANNEL: &str = "v3_markets";

/// Rate-limit buckets for the public endpoints this connector calls.
#[must_use]
pub fn rate_limits() -> Vec<RateLimit> {
    let window = Duration::from_secs(10);
    vec![
        RateLimit::new(PUBLIC_ENDPOINT_LIMIT, 175, window),
        RateLimit::new(CANDLES_ENDPOINT, 175, window).linked_to(PUBLIC_ENDPOINT_LIMIT, 1),
        RateLimit::new(HEALTH_CHECK_ENDPOINT, 175, window).linked_to(PUBLIC_ENDPOINT_LIMIT, 1),
    ]
}
