use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Column names of the canonical candle, in field order.
///
/// Tabular consumers (CSV writers, dataframes) should use these headers so the
/// shape stays identical across exchanges.
pub const CANDLE_COLUMNS: [&str; 10] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "quote_asset_volume",
    "n_trades",
    "taker_buy_base_volume",
    "taker_buy_quote_volume",
];

/// One OHLCV record for a fixed time bucket.
///
/// The shape is the superset of fields across supported exchanges; fields an
/// exchange does not report are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start in the exchange-native epoch resolution (seconds or ms).
    pub timestamp: i64,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Closing (or latest, for the in-progress bucket) price.
    pub close: Decimal,
    /// Base-asset volume.
    pub volume: Decimal,
    /// Quote-asset volume.
    pub quote_volume: Decimal,
    /// Number of trades in the bucket.
    pub trade_count: u64,
    /// Base volume bought by takers.
    pub taker_buy_base_volume: Decimal,
    /// Quote volume bought by takers.
    pub taker_buy_quote_volume: Decimal,
}

impl Candle {
    /// Build a candle from the always-present OHLCV fields; the rest are zero.
    #[must_use]
    pub fn ohlcv(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            ..Self::default()
        }
    }

    /// Returns the candle as a row of strings aligned with [`CANDLE_COLUMNS`].
    #[must_use]
    pub fn to_row(&self) -> [String; 10] {
        [
            self.timestamp.to_string(),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.to_string(),
            self.quote_volume.to_string(),
            self.trade_count.to_string(),
            self.taker_buy_base_volume.to_string(),
            self.taker_buy_quote_volume.to_string(),
        ]
    }
}
