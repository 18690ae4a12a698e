//! # Protocol Module
//!
//! The reader's line-oriented ASCII protocol: raw bytes are assembled into
//! lines ([`line`]), classified ([`message`]) and dispatched into UI events
//! and alias updates ([`dispatcher`]). Outbound commands live in [`command`].

pub mod cache;
pub mod command;
pub mod dispatcher;
pub mod line;
pub mod message;
pub mod uid;

pub use cache::AliasCache;
pub use command::DeviceCommand;
pub use dispatcher::{Dispatch, Dispatcher};
pub use line::LineAssembler;
pub use message::{LogRecord, Message};
