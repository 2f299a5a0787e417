//! Middleware trait for wrapping `RequestGateway` implementations.

use std::sync::Arc;

use crate::gateway::RequestGateway;

/// Trait implemented by gateway middleware layers.
///
/// A middleware consumes an inner gateway and returns a wrapped gateway that
/// adds behavior around `execute` (throttling, logging).
pub trait GatewayMiddleware: Send + Sync {
    /// Wrap `inner` and return the layered gateway.
    fn apply(self: Box<Self>, inner: Arc<dyn RequestGateway>) -> Arc<dyn RequestGateway>;

    /// Middleware name for introspection and logs.
    fn name(&self) -> &'static str;

    /// Configuration snapshot for inspection.
    fn config_json(&self) -> serde_json::Value;
}
