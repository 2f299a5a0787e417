//! Candela-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod config;
mod error;
mod rate_limit;
mod status;

pub use config::FeedConfig;
pub use error::CandlesError;
pub use rate_limit::{LinkedLimit, RateLimit};
pub use status::NetworkStatus;
