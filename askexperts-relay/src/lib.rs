//! Relay Pool: publish a signed event to N relays, subscribe to filters
//! across M relays deduplicating by event id, and drive bounded-time
//! fetches. See [`RelayPool`] for the full contract.

pub mod error;
pub mod filter;
pub mod memory;
pub mod pool;
pub mod ws;

pub use error::{RelayError, RelayResult};
pub use filter::Filter;
pub use memory::InMemoryRelayPool;
pub use pool::{PublishResult, RelayPool, Subscription};
pub use ws::{RelayPoolStats, WsRelayPool};
