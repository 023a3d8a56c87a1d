//! # Warden Cross-Proxy
//!
//! Lets several proxies behave like one network: shared player presence
//! (`/find`, `/glist`, global counts) and relays for private messages,
//! broadcasts, staff chat and punishment-driven disconnects.

pub mod bus;
pub mod error;
pub mod presence;
pub mod protocol;
pub mod service;

pub use bus::{LocalBus, MessageBus, RedisBus};
pub use error::CrossProxyError;
pub use presence::{PresenceEntry, PresenceRegistry};
pub use protocol::{CrossProxyMessage, Envelope, RemotePlayer};
pub use service::{CrossProxyService, Delivery, RelayHandler};

#[cfg(test)]
mod tests;
