//! # Serial Module
//!
//! The serial transport: link settings and opening ([`port`]) and device
//! discovery ([`ports`]).

pub mod port;
pub mod ports;

pub use port::{PortSettings, SerialStream, open_port};
pub use ports::{auto_connect, find_device, list_ports};
