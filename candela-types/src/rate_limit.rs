//! Named rate-limit buckets enforced by the request gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A weighted reference from one bucket to a shared parent bucket.
///
/// A request tagged with the owning limit also consumes `weight` units from
/// `limit_id` (e.g. every public endpoint draws from a global per-second pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedLimit {
    /// Identifier of the parent bucket.
    pub limit_id: String,
    /// Units consumed from the parent bucket per request.
    pub weight: u64,
}

impl LinkedLimit {
    /// Convenience constructor.
    pub fn new(limit_id: impl Into<String>, weight: u64) -> Self {
        Self {
            limit_id: limit_id.into(),
            weight,
        }
    }
}

/// A quota of `limit` units per `window` for requests tagged `limit_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Bucket identifier carried by every request (usually the endpoint path).
    pub limit_id: String,
    /// Maximum units that may be consumed within one window.
    pub limit: u64,
    /// Length of the accounting window.
    pub window: Duration,
    /// Parent buckets charged alongside this one.
    #[serde(default)]
    pub linked_limits: Vec<LinkedLimit>,
}

impl RateLimit {
    /// Build a bucket without linked parents.
    pub fn new(limit_id: impl Into<String>, limit: u64, window: Duration) -> Self {
        Self {
            limit_id: limit_id.into(),
            limit,
            window,
            linked_limits: Vec::new(),
        }
    }

    /// Charge `weight` units of `parent` for every request against this bucket.
    #[must_use]
    pub fn linked_to(mut self, parent: impl Into<String>, weight: u64) -> Self {
        self.linked_limits.push(LinkedLimit::new(parent, weight));
        self
    }
}
