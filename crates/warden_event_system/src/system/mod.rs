/// Event system module - split into registry, dispatch and statistics
mod core;
mod emitters;
mod handlers;
mod stats;

pub use core::EventSystem;
pub use handlers::FnHandler;
pub use stats::EventSystemStats;
