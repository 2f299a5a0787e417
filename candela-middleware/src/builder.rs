//! Builder for composing request gateways with middleware layers.
//!
//! Layers form an onion around the raw gateway. They are stored
//! outermost-first (the last one added wraps everything else) and applied in
//! reverse during [`GatewayBuilder::build`].
//!
//! ```text
//! builder.with_rate_limits(..).layer(custom)
//!
//! Storage: [custom, ThrottledGateway]
//! Result:  custom(ThrottledGateway(raw))
//! ```

use std::sync::Arc;

use candela_core::{GatewayMiddleware, RateLimit, RequestGateway};
use serde_json::{Value, json};

use crate::throttle::ThrottleMiddleware;

const THROTTLE: &str = "ThrottledGateway";

/// Composes a raw gateway with layered wrappers.
pub struct GatewayBuilder {
    raw: Arc<dyn RequestGateway>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn GatewayMiddleware>>,
}

impl GatewayBuilder {
    /// Create a new builder from a raw, unwrapped gateway.
    #[must_use]
    pub fn new(raw: Arc<dyn RequestGateway>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Add or replace rate limiting at the outermost position.
    #[must_use]
    pub fn with_rate_limits(mut self, limits: Vec<RateLimit>) -> Self {
        self.layers.retain(|m| m.name() != THROTTLE);
        self.layers.insert(0, Box::new(ThrottleMiddleware::new(limits)));
        self
    }

    /// Remove rate limiting if present.
    #[must_use]
    pub fn without_rate_limits(mut self) -> Self {
        self.layers.retain(|m| m.name() != THROTTLE);
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn GatewayMiddleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Layer names, outermost first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// Snapshot of the stack for inspection, outermost first, with the raw
    /// gateway as the innermost entry.
    #[must_use]
    pub fn describe(&self) -> Value {
        let mut stack: Vec<Value> = self
            .layers
            .iter()
            .map(|m| json!({ "name": m.name(), "config": m.config_json() }))
            .collect();
        stack.push(json!({
            "name": "RawGateway",
            "config": { "name": self.raw.name() },
        }));
        Value::Array(stack)
    }

    /// Build the wrapped gateway, applying layers innermost first.
    #[must_use]
    pub fn build(self) -> Arc<dyn RequestGateway> {
        let mut acc: Arc<dyn RequestGateway> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
