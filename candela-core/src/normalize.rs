//! Conversion of raw exchange records into canonical candles.
//!
//! Each connector describes where the canonical fields live in its JSON
//! records with a [`RecordLayout`]. The required fields (timestamp and OHLC)
//! must be present and numeric; every other field is zero when the layout
//! does not name it or the record omits it. A field that is present but not
//! numeric is always an error: pages are ingested all-or-nothing.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{Candle, CandlesError};

/// Encoding of the timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// Integer seconds since the epoch.
    EpochSeconds,
    /// Integer milliseconds since the epoch.
    EpochMillis,
    /// RFC 3339 / ISO-8601 string, converted to epoch seconds.
    Iso8601,
}

/// Field names of one exchange's candle records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Key of the bucket start time.
    pub timestamp: &'static str,
    /// How the timestamp is encoded.
    pub timestamp_format: TimestampFormat,
    /// Key of the open price.
    pub open: &'static str,
    /// Key of the high price.
    pub high: &'static str,
    /// Key of the low price.
    pub low: &'static str,
    /// Key of the close price.
    pub close: &'static str,
    /// Key of the base volume, if reported.
    pub volume: Option<&'static str>,
    /// Key of the quote volume, if reported.
    pub quote_volume: Option<&'static str>,
    /// Key of the trade count, if reported.
    pub trade_count: Option<&'static str>,
    /// Key of the taker buy base volume, if reported.
    pub taker_buy_base_volume: Option<&'static str>,
    /// Key of the taker buy quote volume, if reported.
    pub taker_buy_quote_volume: Option<&'static str>,
}

/// Convert one raw record into a canonical candle.
///
/// # Errors
/// Returns `CandlesError::MalformedRecord` if the record is not an object, a
/// required field is missing, or any present field is not numeric.
pub fn normalize(raw: &Value, layout: &RecordLayout) -> Result<Candle, CandlesError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| CandlesError::malformed(format!("expected object, got {raw}")))?;

    let timestamp = parse_timestamp(
        layout.timestamp,
        required(obj, layout.timestamp)?,
        layout.timestamp_format,
    )?;

    let trade_count = match optional(obj, layout.trade_count) {
        Some((k, v)) => parse_count(k, v)?,
        None => 0,
    };

    Ok(Candle {
        timestamp,
        open: parse_decimal(layout.open, required(obj, layout.open)?)?,
        high: parse_decimal(layout.high, required(obj, layout.high)?)?,
        low: parse_decimal(layout.low, required(obj, layout.low)?)?,
        close: parse_decimal(layout.close, required(obj, layout.close)?)?,
        volume: optional_decimal(obj, layout.volume)?,
        quote_volume: optional_decimal(obj, layout.quote_volume)?,
        trade_count,
        taker_buy_base_volume: optional_decimal(obj, layout.taker_buy_base_volume)?,
        taker_buy_quote_volume: optional_decimal(obj, layout.taker_buy_quote_volume)?,
    })
}

/// Normalize a whole page and return it oldest-first with unique timestamps.
///
/// Exchanges disagree on page order (some return newest-first), so the result
/// is sorted. If a page repeats a timestamp, the later record wins.
///
/// # Errors
/// Fails with `CandlesError::MalformedRecord` if any record fails; no partial
/// page is returned.
pub fn normalize_page(
    records: &[Value],
    layout: &RecordLayout,
) -> Result<Vec<Candle>, CandlesError> {
    let mut out = records
        .iter()
        .map(|r| normalize(r, layout))
        .collect::<Result<Vec<_>, _>>()?;
    // stable sort keeps arrival order among equal timestamps
    out.sort_by_key(|c| c.timestamp);
    let mut deduped: Vec<Candle> = Vec::with_capacity(out.len());
    for c in out {
        match deduped.last_mut() {
            Some(last) if last.timestamp == c.timestamp => *last = c,
            _ => deduped.push(c),
        }
    }
    Ok(deduped)
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, CandlesError> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| CandlesError::malformed(format!("missing required field {key}")))
}

// Absent keys and explicit nulls both count as "not reported".
fn optional<'a>(
    obj: &'a Map<String, Value>,
    key: Option<&'static str>,
) -> Option<(&'static str, &'a Value)> {
    let key = key?;
    obj.get(key).filter(|v| !v.is_null()).map(|v| (key, v))
}

fn optional_decimal(
    obj: &Map<String, Value>,
    key: Option<&'static str>,
) -> Result<Decimal, CandlesError> {
    optional(obj, key).map_or(Ok(Decimal::ZERO), |(k, v)| parse_decimal(k, v))
}

fn parse_decimal(key: &str, v: &Value) -> Result<Decimal, CandlesError> {
    let parsed = match v {
        Value::String(s) => parse_decimal_str(s.trim()),
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        _ => None,
    };
    parsed.ok_or_else(|| CandlesError::malformed(format!("field {key} is not numeric: {v}")))
}

fn parse_decimal_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_count(key: &str, v: &Value) -> Result<u64, CandlesError> {
    let parsed = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CandlesError::malformed(format!("field {key} is not a non-negative integer: {v}"))
    })
}

fn parse_timestamp(key: &str, v: &Value, format: TimestampFormat) -> Result<i64, CandlesError> {
    let bad = || CandlesError::malformed(format!("field {key} is not a valid timestamp: {v}"));
    match format {
        TimestampFormat::EpochSeconds | TimestampFormat::EpochMillis => match v {
            Value::Number(n) => n.as_i64().ok_or_else(bad),
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| bad()),
            _ => Err(bad()),
        },
        TimestampFormat::Iso8601 => v
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.timestamp())
            .ok_or_else(bad),
    }
}
