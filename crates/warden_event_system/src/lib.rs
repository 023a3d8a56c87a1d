//! # Warden Event System
//!
//! Typed proxy events, a priority-ordered handler registry and the host
//! abstraction the rest of Warden is written against.
//!
//! ## Core Features
//!
//! - **Mutable events**: handlers can deny logins, rewrite chat or refuse
//!   backend connections, and later handlers see the change
//! - **Priority dispatch**: handlers run `First` to `Last`, ties in
//!   registration order, and dispatch stops once an event is cancelled
//! - **Host abstraction**: [`ProxyHost`] hides the proxy runtime;
//!   [`LocalProxy`] is an in-memory implementation
//! - **Graceful shutdown**: [`ShutdownState`] orders the phases of leaving
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden_event_system::*;
//!
//! # async fn example() -> Result<(), EventError> {
//! let events = create_warden_event_system();
//!
//! events.on::<ChatEvent, _>("no-caps", EventPriority::Normal, FnHandler::new(|event: &mut ChatEvent| {
//!     event.message = event.message.to_lowercase();
//!     Ok(())
//! })).await?;
//!
//! let player = PlayerInfo::new(PlayerId::new(), "Steve");
//! let mut chat = ChatEvent::new(player, "HELLO");
//! events.emit(&mut chat).await?;
//! assert_eq!(chat.message, "hello");
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod local;
pub mod plugin;
pub mod proxy;
pub mod shutdown;
pub mod system;
pub mod types;
pub mod utils;

pub use events::*;
pub use local::LocalProxy;
pub use plugin::{PluginError, SimplePlugin};
pub use proxy::{HostError, ProxyHost};
pub use shutdown::{ShutdownPhase, ShutdownState};
pub use system::{EventSystem, EventSystemStats, FnHandler};
pub use types::{CommandSource, PlayerId, PlayerInfo, CONSOLE_NAME};
pub use utils::{create_warden_event_system, current_timestamp, current_timestamp_millis};
