//! Deterministic candle series for tests and demos.

use candela_core::Candle;
use rust_decimal::Decimal;

/// A flat candle at `price` with unit volume.
#[must_use]
pub fn flat(timestamp: i64, price: i64) -> Candle {
    let px = Decimal::from(price);
    Candle {
        timestamp,
        open: px,
        high: px,
        low: px,
        close: px,
        volume: Decimal::ONE,
        quote_volume: px,
        trade_count: 1,
        ..Candle::default()
    }
}

/// `count` consecutive candles starting at `start`, `step` apart, with the
/// close price rising by one per bucket.
#[must_use]
pub fn series(start: i64, step: i64, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let i = i64::try_from(i).unwrap_or(i64::MAX);
            flat(start + i * step, 100 + i)
        })
        .collect()
}
