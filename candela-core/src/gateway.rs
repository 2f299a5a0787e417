//! Transport seams consumed by connectors.
//!
//! The feed never opens sockets itself. REST calls go through a
//! [`RequestGateway`], which owns connection management and rate limiting,
//! and push updates arrive through a [`PushChannel`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::CandlesError;

/// One REST call tagged with the rate-limit bucket it is charged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    /// Absolute URL of the endpoint.
    pub url: String,
    /// Bucket identifier enforced by the gateway's throttler.
    pub limit_id: String,
    /// Query parameters in insertion order.
    pub params: Vec<(String, String)>,
}

impl RestRequest {
    /// Request without parameters.
    pub fn new(url: impl Into<String>, limit_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            limit_id: limit_id.into(),
            params: Vec::new(),
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Value of the first parameter named `key`.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Rate-limited REST executor.
///
/// Exceeding a quota suspends the caller inside `execute`; it is not an error.
#[async_trait]
pub trait RequestGateway: Send + Sync {
    /// Name used in transport errors and logs.
    fn name(&self) -> &'static str;

    /// Perform the request and return the decoded JSON body.
    ///
    /// # Errors
    /// Returns `CandlesError::Transport` when the request fails or the body
    /// cannot be decoded.
    async fn execute(&self, req: RestRequest) -> Result<Value, CandlesError>;
}

/// Bidirectional message channel for push subscriptions.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Open the underlying connection. Default: no-op for channels that are
    /// connected on construction.
    async fn connect(&self) -> Result<(), CandlesError> {
        Ok(())
    }

    /// Send one structured message.
    async fn send(&self, payload: Value) -> Result<(), CandlesError>;

    /// Wait for the next message; `Ok(None)` means the channel closed.
    async fn receive(&self) -> Result<Option<Value>, CandlesError>;
}

impl dyn RequestGateway {
    /// Build a gateway from a closure. Handy for tests and for wiring an
    /// existing HTTP client without a dedicated type.
    pub fn from_fn<F>(name: &'static str, f: F) -> Arc<dyn RequestGateway>
    where
        F: Send + Sync + 'static + Fn(RestRequest) -> Result<Value, CandlesError>,
    {
        struct FnGateway<F> {
            name: &'static str,
            f: F,
        }

        #[async_trait]
        impl<F> RequestGateway for FnGateway<F>
        where
            F: Send + Sync + 'static + Fn(RestRequest) -> Result<Value, CandlesError>,
        {
            fn name(&self) -> &'static str {
                self.name
            }

            async fn execute(&self, req: RestRequest) -> Result<Value, CandlesError> {
                (self.f)(req)
            }
        }

        Arc::new(FnGateway { name, f })
    }
}
