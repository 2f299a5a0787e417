use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Variants separate transport failures (retried by the backfill engine),
/// data problems (a whole page is rejected), configuration errors (fatal at
/// startup), and cooperative cancellation (never retried).
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandlesError {
    /// A request or connection to the upstream failed.
    #[error("{connector} transport failed: {msg}")]
    Transport {
        /// Connector or gateway name that failed.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A fetched record could not be converted into a canonical candle.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Backfill spent its request budget before the window reached capacity.
    #[error("insufficient history: have {have} of {wanted} candles")]
    InsufficientHistory {
        /// Number of candles held when backfill gave up.
        have: usize,
        /// Configured window capacity.
        wanted: usize,
    },

    /// The interval code (or native resolution) is not in the connector's table.
    #[error("unsupported interval: {0}")]
    UnsupportedInterval(String),

    /// Configuration failed validation (capacity, interval table, etc.).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested capability is not implemented by the connector.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Capability label, e.g. "push/candles".
        capability: String,
    },

    /// The operation was interrupted by a stop signal.
    #[error("cancelled")]
    Cancelled,
}

impl CandlesError {
    /// Helper: build a `Transport` error with the connector name and message.
    pub fn transport(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `MalformedRecord` error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Helper: build an `UnsupportedInterval` error.
    pub fn unsupported_interval(code: impl Into<String>) -> Self {
        Self::UnsupportedInterval(code.into())
    }

    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// Returns true for the cooperative cancellation signal.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if a failed page fetch should be retried after the backoff delay.
    ///
    /// Transport and data failures are transient from the feed's point of view;
    /// cancellation, configuration errors, and budget exhaustion are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::MalformedRecord(_))
    }
}
