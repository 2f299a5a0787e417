//! candela-mock
//!
//! In-memory stand-ins for an exchange: a candles connector driven by a
//! controller, and a push channel with an inspectable outbox.

mod channel;
mod connector;
pub mod fixtures;

pub use channel::MockPushChannel;
pub use connector::{EdgeMode, MockBehavior, MockConnector, MockConnectorBuilder, MockController};
