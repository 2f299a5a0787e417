use core::fmt;

use serde::{Deserialize, Serialize};

/// Reachability of the upstream as seen by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkStatus {
    /// The health endpoint answered successfully.
    Connected,
    /// The health check failed at the transport level.
    NotConnected,
}

impl NetworkStatus {
    /// Returns true when the upstream is reachable.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::NotConnected => f.write_str("not connected"),
        }
    }
}
