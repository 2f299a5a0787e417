#![doc = include_str!("../README.md")]
//! candela-middleware
//!
//! Re-exports for gateway middleware.

mod builder;
mod throttle;

pub use crate::builder::GatewayBuilder;
pub use crate::throttle::{ThrottleMiddleware, ThrottledGateway, Throttler};
