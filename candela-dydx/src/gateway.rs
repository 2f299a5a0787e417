//! HTTP gateway backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use candela_core::{CandlesError, RequestGateway, RestRequest};
use serde_json::Value;

const GATEWAY_NAME: &str = "dydx-rest";

/// Plain GET executor. Rate limiting is layered on top with
/// `candela_middleware::GatewayBuilder`.
#[derive(Clone)]
pub struct RestGateway {
    client: reqwest::Client,
}

impl RestGateway {
    /// Build a gateway with a 10 second request timeout.
    ///
    /// # Errors
    /// Returns `CandlesError::Transport` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, CandlesError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CandlesError::transport(GATEWAY_NAME, e.to_string()))?;
        Ok(Self { client })
    }

    /// Re-use an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestGateway for RestGateway {
    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }

    async fn execute(&self, req: RestRequest) -> Result<Value, CandlesError> {
        let resp = self
            .client
            .get(&req.url)
            .query(&req.params)
            .send()
            .await
            .map_err(|e| CandlesError::transport(GATEWAY_NAME, format!("GET {}: {e}", req.url)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CandlesError::transport(
                GATEWAY_NAME,
                format!("GET {} returned {status}: {body}", req.url),
            ));
        }

        resp.json::<Value>().await.map_err(|e| {
            CandlesError::transport(GATEWAY_NAME, format!("GET {}: invalid JSON body: {e}", req.url))
        })
    }
}
