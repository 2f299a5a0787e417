use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::CandlesError;

/// Immutable bijection between human interval codes and exchange resolutions.
///
/// Both directions are built together in [`IntervalMap::new`], which rejects
/// tables where two codes share a resolution (or a code appears twice). After
/// construction only the two lookups are exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalMap {
    to_native: HashMap<String, String>,
    from_native: HashMap<String, String>,
    // insertion order, for stable listings
    codes: Vec<String>,
}

impl IntervalMap {
    /// Build the table from `(code, native)` pairs.
    ///
    /// # Errors
    /// Returns `CandlesError::InvalidConfig` if the table is empty or is not a
    /// bijection.
    pub fn new<I, K, V>(pairs: I) -> Result<Self, CandlesError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut to_native = HashMap::new();
        let mut from_native = HashMap::new();
        let mut codes = Vec::new();

        for (code, native) in pairs {
            let code: String = code.into();
            let native: String = native.into();
            match to_native.entry(code.clone()) {
                Entry::Occupied(_) => {
                    return Err(CandlesError::InvalidConfig(format!(
                        "interval code {code} is mapped twice"
                    )));
                }
                Entry::Vacant(v) => {
                    v.insert(native.clone());
                }
            }
            match from_native.entry(native.clone()) {
                Entry::Occupied(e) => {
                    return Err(CandlesError::InvalidConfig(format!(
                        "native resolution {native} is shared by {} and {code}",
                        e.get()
                    )));
                }
                Entry::Vacant(v) => {
                    v.insert(code.clone());
                }
            }
            codes.push(code);
        }

        if codes.is_empty() {
            return Err(CandlesError::InvalidConfig(
                "interval table must not be empty".into(),
            ));
        }

        Ok(Self {
            to_native,
            from_native,
            codes,
        })
    }

    /// Translate an interval code (e.g. "1m") to the exchange resolution.
    ///
    /// # Errors
    /// Returns `CandlesError::UnsupportedInterval` if the code is not in the table.
    pub fn to_native(&self, code: &str) -> Result<&str, CandlesError> {
        self.to_native
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| CandlesError::unsupported_interval(code))
    }

    /// Translate an exchange resolution back to its interval code.
    ///
    /// # Errors
    /// Returns `CandlesError::UnsupportedInterval` if the resolution is unknown.
    pub fn from_native(&self, native: &str) -> Result<&str, CandlesError> {
        self.from_native
            .get(native)
            .map(String::as_str)
            .ok_or_else(|| CandlesError::unsupported_interval(native))
    }

    /// Whether `code` is a supported interval code.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.to_native.contains_key(code)
    }

    /// Supported interval codes in table order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always false for a constructed table; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Length of an interval code in seconds ("1s", "15m", "4h", "1d", "1w", "1M").
///
/// Months are counted as 30 days.
///
/// # Errors
/// Returns `CandlesError::UnsupportedInterval` for codes that do not follow the
/// `<count><unit>` pattern or have a zero count.
pub fn interval_in_seconds(code: &str) -> Result<i64, CandlesError> {
    let split = code
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(i, _)| i)
        .ok_or_else(|| CandlesError::unsupported_interval(code))?;
    let (count, unit) = code.split_at(split);
    let count: i64 = count
        .parse()
        .map_err(|_| CandlesError::unsupported_interval(code))?;
    if count == 0 {
        return Err(CandlesError::unsupported_interval(code));
    }
    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 604_800,
        "M" => 2_592_000,
        _ => return Err(CandlesError::unsupported_interval(code)),
    };
    count
        .checked_mul(unit_secs)
        .ok_or_else(|| CandlesError::unsupported_interval(code))
}
