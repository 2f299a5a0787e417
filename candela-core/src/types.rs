//! Re-export of foundational types from `candela-types`.
// Consolidated re-exports so downstream crates can depend on `candela-core` only

pub use candela_types::{CandlesError, FeedConfig, LinkedLimit, NetworkStatus, RateLimit};

pub use rust_decimal::Decimal;
