//! # Card Bridge
//!
//! Companion bridge for a USB-serial RFID access-control reader that keeps
//! its card list, aliases and access log in EEPROM.
//!
//! The reader speaks a line-oriented ASCII protocol. This crate reads the
//! port, classifies each line, keeps a volatile UID to alias cache and
//! republishes structured events to whatever UI hosts it. Commands go the
//! other way as newline-terminated text, fire-and-forget.
//!
//! ## Architecture
//!
//! - [`serial`]: link settings, opening the port, device discovery
//! - [`protocol`]: line assembly, classification, dispatch, command vocabulary
//! - [`session`]: connection lifecycle, the read loop, command sending
//! - [`events`]: UI events and publishers
//! - [`config`]: TOML configuration
//! - [`error`]: custom error types for the application

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod serial;
pub mod session;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::events::{ChannelPublisher, Event, EventPublisher, JsonLinesPublisher};
    pub use crate::protocol::DeviceCommand;
    pub use crate::session::{Bridge, CommandSender, ConnectionState};
}
